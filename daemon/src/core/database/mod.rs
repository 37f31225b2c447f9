//! Chain state database.
//!
//! The database owns the object store and applies blocks and transactions
//! to it. Every applied block is one undo session kept on the store until the
//! block becomes irreversible, pending transactions share one more session
//! on top of the head block.

mod account;
mod balance;
mod block;
mod comment;
mod escrow;
mod genesis;
mod interest;
mod market;
mod transaction;
mod transfer;

pub use comment::{current_voting_mana, mana_cost, regenerated_mana, vote_mana_cost};
pub use escrow::dispute_median;
pub use interest::accrued_interest;
pub use market::{compare_prices, prices_cross, OrderRequest};

use super::{
    block_log::BlockLog,
    error::BlockchainError,
    fork_db::ForkDatabase,
    objects::*,
    store::{ObjectId, Store, UndoTarget},
};
use crate::config::{DatabaseConfig, GenesisConfig, SkipFlags, BLOCK_LOG_FILENAME};
use ezira_common::{
    account::AccountName,
    asset::Symbol,
    authority::{Authority, AuthorityLevel, AuthorityProvider},
    block::{BlockNumber, SignedBlock},
    config::CHAIN_ID,
    crypto::Hash,
    time::TimestampSeconds,
    transaction::SignedTransaction,
};
use indexmap::IndexMap;
use transaction::PendingTransactions;
use log::{error, info};
use std::{path::Path, sync::Arc};

// The global properties are the first object ever created
const GLOBAL_PROPERTIES_ID: ObjectId = 0;

pub struct Database {
    store: Store,
    fork_db: ForkDatabase,
    block_log: Option<BlockLog>,
    config: DatabaseConfig,
    genesis: GenesisConfig,
    chain_id: Hash,
    // Transactions applied on top of the head block, in arrival order
    pending_transactions: PendingTransactions,
    pending_session: bool,
    halted: bool,
}

impl Database {
    /// Build the genesis state and replay the block log, if any.
    pub fn open(config: DatabaseConfig, genesis: GenesisConfig) -> Result<Self, BlockchainError> {
        let mut store = Store::new(config.shared_memory_size);
        register_objects(&mut store);

        let block_log = if config.disable_block_log {
            None
        } else {
            Some(BlockLog::open(
                Path::new(&config.data_dir).join(BLOCK_LOG_FILENAME),
            )?)
        };

        let mut db = Self {
            store,
            fork_db: ForkDatabase::new(Hash::zero()),
            block_log,
            config,
            genesis,
            chain_id: CHAIN_ID.clone(),
            pending_transactions: IndexMap::new(),
            pending_session: false,
            halted: false,
        };
        db.init_genesis()?;
        db.replay_block_log()?;
        Ok(db)
    }

    fn replay_block_log(&mut self) -> Result<(), BlockchainError> {
        let head = match &self.block_log {
            Some(log) => log.head_num(),
            None => return Ok(()),
        };
        if head == 0 {
            return Ok(());
        }

        info!("replaying {} blocks from the block log", head);
        for num in 1..=head {
            let block = match self.block_log.as_mut() {
                Some(log) => log.read_block(num)?,
                None => None,
            }
            .ok_or_else(|| BlockchainError::CorruptedBlockLog(format!("block {} is missing", num)))?;

            let id = block.id();
            self.apply_block_in_session(&Arc::new(block), SkipFlags::REPLAY)?;
            self.store.commit(u64::from(num));
            self.fork_db.set_root(id);
        }
        info!("replay done, head block is {}", self.head_block_num()?);
        Ok(())
    }

    pub fn chain_id(&self) -> &Hash {
        &self.chain_id
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn genesis_config(&self) -> &GenesisConfig {
        &self.genesis
    }

    /// Read-only access to every table, for inspection.
    pub fn store(&self) -> &Store {
        &self.store
    }

    // Writes go through the undo session open on the store
    pub(crate) fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn fork_db(&self) -> &ForkDatabase {
        &self.fork_db
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn pending_transactions(&self) -> impl Iterator<Item = &SignedTransaction> {
        self.pending_transactions.values().map(|(tx, _)| tx)
    }

    pub fn state_digest(&self) -> Result<Hash, BlockchainError> {
        Ok(self.store.state_digest()?)
    }

    pub fn global_properties(&self) -> Result<&DynamicGlobalPropertyObject, BlockchainError> {
        Ok(self.store.get(GLOBAL_PROPERTIES_ID)?)
    }

    pub fn head_block_num(&self) -> Result<BlockNumber, BlockchainError> {
        Ok(self.global_properties()?.head_block_number)
    }

    pub fn head_block_id(&self) -> Result<Hash, BlockchainError> {
        Ok(self.global_properties()?.head_block_id)
    }

    pub fn head_block_time(&self) -> Result<TimestampSeconds, BlockchainError> {
        Ok(self.global_properties()?.time)
    }

    pub fn last_irreversible_block_num(&self) -> BlockNumber {
        self.fork_db.root_num()
    }

    /// Any reversible block known to this node, on any branch.
    pub fn fetch_block(&self, id: &Hash) -> Option<Arc<SignedBlock>> {
        self.fork_db.get(id)
    }

    pub fn find_account(&self, name: &AccountName) -> Option<&AccountObject> {
        self.store
            .find_by(AccountObject::BY_NAME, &AccountObject::name_key(name))
    }

    pub fn get_account(&self, name: &AccountName) -> Result<&AccountObject, BlockchainError> {
        self.find_account(name)
            .ok_or_else(|| BlockchainError::UnknownAccount(name.clone()))
    }

    pub fn get_account_authority(
        &self,
        name: &AccountName,
    ) -> Result<&AccountAuthorityObject, BlockchainError> {
        self.store
            .find_by(
                AccountAuthorityObject::BY_ACCOUNT,
                &AccountObject::name_key(name),
            )
            .ok_or_else(|| BlockchainError::UnknownAccount(name.clone()))
    }

    pub fn find_asset(&self, symbol: &Symbol) -> Option<&AssetObject> {
        self.store
            .find_by(AssetObject::BY_SYMBOL, &AssetObject::symbol_key(symbol))
    }

    pub fn get_asset(&self, symbol: &Symbol) -> Result<&AssetObject, BlockchainError> {
        self.find_asset(symbol)
            .ok_or_else(|| BlockchainError::UnknownAsset(symbol.clone()))
    }

    pub fn find_producer(&self, owner: &AccountName) -> Option<&ProducerObject> {
        self.store
            .find_by(ProducerObject::BY_OWNER, &ProducerObject::owner_key(owner))
    }

    pub fn find_mediator(&self, account: &AccountName) -> Option<&MediatorObject> {
        self.store
            .find_by(MediatorObject::BY_ACCOUNT, &MediatorObject::account_key(account))
    }

    pub fn find_escrow(&self, from: &AccountName, escrow_id: &str) -> Option<&EscrowObject> {
        self.store
            .find_by(EscrowObject::BY_FROM_ID, &EscrowObject::escrow_key(from, escrow_id))
    }

    pub fn get_escrow(
        &self,
        from: &AccountName,
        escrow_id: &str,
    ) -> Result<&EscrowObject, BlockchainError> {
        self.find_escrow(from, escrow_id)
            .ok_or_else(|| BlockchainError::UnknownEscrow {
                from: from.clone(),
                escrow_id: escrow_id.to_string(),
            })
    }

    pub fn find_comment(&self, author: &AccountName, permlink: &str) -> Option<&CommentObject> {
        self.store
            .find_by(CommentObject::BY_PERMLINK, &CommentObject::permlink_key(author, permlink))
    }

    pub fn get_comment(
        &self,
        author: &AccountName,
        permlink: &str,
    ) -> Result<&CommentObject, BlockchainError> {
        self.find_comment(author, permlink)
            .ok_or_else(|| BlockchainError::UnknownComment {
                author: author.clone(),
                permlink: permlink.to_string(),
            })
    }

    pub fn find_comment_vote(
        &self,
        comment: ObjectId,
        voter: &AccountName,
    ) -> Option<&CommentVoteObject> {
        self.store
            .find_by(CommentVoteObject::BY_COMMENT_VOTER, &CommentVoteObject::vote_key(comment, voter))
    }

    pub fn get_reward_fund(&self, symbol: &Symbol) -> Result<&RewardFundObject, BlockchainError> {
        self.store
            .find_by(RewardFundObject::BY_SYMBOL, &RewardFundObject::symbol_key(symbol))
            .ok_or_else(|| BlockchainError::UnknownAsset(symbol.clone()))
    }

    pub fn find_limit_order(&self, owner: &AccountName, order_id: u32) -> Option<&LimitOrderObject> {
        self.store
            .find_by(LimitOrderObject::BY_ACCOUNT, &LimitOrderObject::order_key(owner, order_id))
    }

    pub fn find_recurring_transfer(
        &self,
        from: &AccountName,
        transfer_id: &str,
    ) -> Option<&RecurringTransferObject> {
        self.store.find_by(
            RecurringTransferObject::BY_TRANSFER_ID,
            &RecurringTransferObject::transfer_key(from, transfer_id),
        )
    }

    pub fn find_savings_withdraw(
        &self,
        from: &AccountName,
        request_id: &str,
    ) -> Option<&SavingsWithdrawObject> {
        self.store.find_by(
            SavingsWithdrawObject::BY_FROM_REQUEST,
            &SavingsWithdrawObject::request_key(from, request_id),
        )
    }

    fn check_not_halted(&self) -> Result<(), BlockchainError> {
        if self.halted {
            return Err(BlockchainError::Halted);
        }
        Ok(())
    }

    // Halt on fatal errors, the store can no longer be trusted after one
    fn check_fatal<R>(&mut self, result: Result<R, BlockchainError>) -> Result<R, BlockchainError> {
        if let Err(e) = &result {
            if e.is_fatal() && !self.halted {
                error!("fatal error, halting the database: {}", e);
                self.halted = true;
            }
        }
        result
    }

    /// Check the supply of every asset against every place units can be held.
    pub fn validate_invariants(&self) -> Result<(), BlockchainError> {
        for asset in self.store.iter::<AssetObject>() {
            let mut total: i128 = 0;

            let prefix = AccountBalanceObject::symbol_key(&asset.symbol);
            for balance in self
                .store
                .iter_index::<AccountBalanceObject>(AccountBalanceObject::BY_SYMBOL, &prefix)
            {
                for value in [balance.liquid, balance.staked, balance.savings, balance.reward] {
                    if value < 0 {
                        return Err(BlockchainError::InvariantViolation(format!(
                            "negative {} balance of {}",
                            asset.symbol, balance.owner
                        )));
                    }
                    total += value as i128;
                }
            }

            for escrow in self.store.iter::<EscrowObject>() {
                if escrow.balance.symbol == asset.symbol {
                    total += escrow.balance.amount as i128;
                }
            }
            for order in self.store.iter::<LimitOrderObject>() {
                if order.sell_price.base.symbol == asset.symbol {
                    total += order.for_sale as i128;
                }
            }
            for withdraw in self.store.iter::<SavingsWithdrawObject>() {
                if withdraw.amount.symbol == asset.symbol {
                    total += withdraw.amount.amount as i128;
                }
            }
            for fund in self.store.iter::<RewardFundObject>() {
                if fund.symbol == asset.symbol {
                    total += fund.content_reward_balance as i128;
                }
            }

            if total != asset.total_supply as i128 {
                return Err(BlockchainError::InvariantViolation(format!(
                    "supply of {} is {} but {} units are held",
                    asset.symbol, asset.total_supply, total
                )));
            }
        }

        for escrow in self.store.iter::<EscrowObject>() {
            let bond = escrow.bond();
            let mut expected = bond.amount as i128 * escrow.approvers().len() as i128;
            if escrow.from_approved {
                expected += escrow.payment.amount as i128;
            }
            if expected != escrow.balance.amount as i128 {
                return Err(BlockchainError::InvariantViolation(format!(
                    "escrow {} of {} holds {} instead of {}",
                    escrow.escrow_id, escrow.from, escrow.balance.amount, expected
                )));
            }
        }

        Ok(())
    }
}

impl UndoTarget for Database {
    fn undo_store(&mut self) -> &mut Store {
        &mut self.store
    }
}

impl AuthorityProvider for Database {
    fn get_authority(&self, account: &AccountName, level: AuthorityLevel) -> Option<Authority> {
        let authority = self.get_account_authority(account).ok()?;
        Some(match level {
            AuthorityLevel::Owner => authority.owner.clone(),
            AuthorityLevel::Active => authority.active.clone(),
            AuthorityLevel::Posting => authority.posting.clone(),
        })
    }
}
