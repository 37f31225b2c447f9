// Shared fixture of the chain integration tests
//
// A TestChain is an in-memory database with the genesis account as its only
// producer. Accounts created through it get a deterministic key derived from
// their name, used for every authority level.

#![allow(dead_code)]

use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    authority::Authority,
    block::SignedBlock,
    config::{BLOCK_INTERVAL, MIN_ACCOUNT_CREATION_FEE},
    crypto::KeyPair,
    operation::{AccountCreateOperation, Operation, TransferOperation},
    time::TimestampSeconds,
    transaction::{SignedTransaction, Transaction},
};
use ezira_daemon::{
    config::{DatabaseConfig, GenesisConfig, SkipFlags, GENESIS_ACCOUNT_NAME, GENESIS_KEY_SEED},
    core::{objects::BalanceKind, BlockchainError, Database},
};

pub const COIN: i64 = ezira_common::config::BLOCKCHAIN_PRECISION;

pub fn key_of(name: &str) -> KeyPair {
    if name == GENESIS_ACCOUNT_NAME {
        KeyPair::from_seed(GENESIS_KEY_SEED)
    } else {
        KeyPair::from_seed(name)
    }
}

pub fn coin(amount: i64) -> Asset {
    Asset::new(amount, Symbol::coin())
}

pub fn genesis() -> AccountName {
    AccountName::new(GENESIS_ACCOUNT_NAME)
}

pub struct TestChain {
    pub db: Database,
    // Spreads expirations so identical operations get distinct transaction ids
    nonce: u64,
}

impl TestChain {
    pub fn new() -> Self {
        Self::with_genesis(GenesisConfig::default())
    }

    pub fn with_genesis(genesis: GenesisConfig) -> Self {
        Self::with_config(DatabaseConfig::in_memory(), genesis)
    }

    pub fn with_config(config: DatabaseConfig, genesis: GenesisConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let db = Database::open(config, genesis).expect("open database");
        Self { db, nonce: 0 }
    }

    pub fn now(&self) -> TimestampSeconds {
        self.db.head_block_time().expect("head time")
    }

    pub fn head_num(&self) -> u32 {
        self.db.head_block_num().expect("head number")
    }

    /// Build a signed transaction expiring shortly after the head block.
    pub fn transaction(&mut self, signers: &[&str], ops: Vec<Operation>) -> SignedTransaction {
        self.nonce += 1;
        let mut trx = Transaction::new(self.now() + 60 + self.nonce % 3_000);
        for op in ops {
            trx.push_operation(op);
        }
        let mut tx = SignedTransaction::new(trx);
        for signer in signers {
            tx.sign(&key_of(signer), self.db.chain_id());
        }
        tx
    }

    pub fn push(&mut self, signers: &[&str], op: impl Into<Operation>) -> Result<(), BlockchainError> {
        let tx = self.transaction(signers, vec![op.into()]);
        self.db.push_transaction(&tx, SkipFlags::NOTHING)
    }

    pub fn generate_block(&mut self) -> Result<SignedBlock, BlockchainError> {
        let time = self.now() + BLOCK_INTERVAL;
        self.generate_block_at(time)
    }

    /// Produce one block at the first slot at or after `time`.
    pub fn generate_block_at(&mut self, time: TimestampSeconds) -> Result<SignedBlock, BlockchainError> {
        let genesis_time = self.db.global_properties()?.genesis_time;
        let slots = (time.max(self.now() + 1) - genesis_time).div_ceil(BLOCK_INTERVAL);
        let timestamp = genesis_time + slots * BLOCK_INTERVAL;
        self.db
            .generate_block(timestamp, &genesis(), &key_of(GENESIS_ACCOUNT_NAME), SkipFlags::NOTHING)
    }

    pub fn generate_blocks(&mut self, count: u32) -> Result<(), BlockchainError> {
        for _ in 0..count {
            self.generate_block()?;
        }
        Ok(())
    }

    pub fn create_account(&mut self, name: &str) -> Result<(), BlockchainError> {
        let key = key_of(name).public_key();
        self.push(
            &[GENESIS_ACCOUNT_NAME],
            AccountCreateOperation {
                creator: genesis(),
                new_account_name: name.into(),
                owner: Authority::from_key(key),
                active: Authority::from_key(key),
                posting: Authority::from_key(key),
                memo_key: key,
                json_metadata: String::new(),
                fee: coin(MIN_ACCOUNT_CREATION_FEE),
            },
        )
    }

    pub fn fund(&mut self, name: &str, amount: i64) -> Result<(), BlockchainError> {
        self.push(
            &[GENESIS_ACCOUNT_NAME],
            TransferOperation {
                from: genesis(),
                to: name.into(),
                amount: coin(amount),
                memo: String::new(),
            },
        )
    }

    /// Create funded accounts and include them in a block.
    pub fn create_funded_accounts(&mut self, names: &[&str], amount: i64) -> Result<(), BlockchainError> {
        for name in names {
            self.create_account(name)?;
            self.fund(name, amount)?;
        }
        self.generate_block()?;
        Ok(())
    }

    pub fn balance(&self, name: &str, kind: BalanceKind) -> i64 {
        self.db.get_balance(&name.into(), &Symbol::coin(), kind).amount
    }

    pub fn liquid(&self, name: &str) -> i64 {
        self.balance(name, BalanceKind::Liquid)
    }
}
