use super::{Database, GLOBAL_PROPERTIES_ID};
use crate::{
    config::{
        CREDIT_LIQUID_INTEREST_RATE, CREDIT_SAVINGS_INTEREST_RATE, CREDIT_STAKED_INTEREST_RATE,
        GENESIS_ACCOUNT_NAME, GENESIS_KEY_SEED,
    },
    core::{error::BlockchainError, objects::*},
};
use anyhow::anyhow;
use ezira_common::{
    account::AccountName,
    asset::{Asset, AssetType, Symbol},
    authority::Authority,
    config::{COIN_UNSTAKE_INTERVALS, CONTENT_CONSTANT, MAX_ASSET_SUPPLY, RESET_ACCOUNT_DELAY_DAYS},
    crypto::{Hash, KeyPair, PublicKey},
};
use log::info;
use std::str::FromStr;

impl Database {
    /// Public key controlling the genesis account.
    pub fn genesis_key(&self) -> Result<PublicKey, BlockchainError> {
        match &self.genesis.genesis_key {
            Some(key) => PublicKey::from_str(key)
                .map_err(|e| anyhow!("invalid genesis key {}: {}", key, e).into()),
            None => Ok(KeyPair::from_seed(GENESIS_KEY_SEED).public_key()),
        }
    }

    // Written without any undo session, the genesis state is permanent
    pub(super) fn init_genesis(&mut self) -> Result<(), BlockchainError> {
        let time = self.genesis.genesis_time;
        let key = self.genesis_key()?;
        let name = AccountName::new(GENESIS_ACCOUNT_NAME);
        info!("initializing genesis state at {} for {}", time, name);

        let dgp_id = self.store.create(DynamicGlobalPropertyObject {
            id: 0,
            head_block_number: 0,
            head_block_id: Hash::zero(),
            time,
            genesis_time: time,
            current_producer: name.clone(),
            last_irreversible_block_num: 0,
            producer_reward: self.genesis.producer_reward,
            content_reward: self.genesis.content_reward,
        })?;
        if dgp_id != GLOBAL_PROPERTIES_ID {
            return Err(BlockchainError::InvariantViolation(
                "global properties must be the first object".to_string(),
            ));
        }

        let assets = [
            (Symbol::coin(), AssetType::Currency, (0, 0, 0)),
            (Symbol::equity(), AssetType::Equity, (0, 0, 0)),
            (Symbol::usd(), AssetType::Stablecoin, (0, 0, 0)),
            (
                Symbol::credit(),
                AssetType::Credit,
                (
                    CREDIT_LIQUID_INTEREST_RATE,
                    CREDIT_STAKED_INTEREST_RATE,
                    CREDIT_SAVINGS_INTEREST_RATE,
                ),
            ),
        ];
        for (symbol, asset_type, (liquid, staked, savings)) in assets {
            self.store.create(AssetObject {
                id: 0,
                symbol,
                asset_type,
                issuer: name.clone(),
                total_supply: 0,
                max_supply: MAX_ASSET_SUPPLY,
                unstake_intervals: COIN_UNSTAKE_INTERVALS,
                liquid_interest_rate: liquid,
                staked_interest_rate: staked,
                savings_interest_rate: savings,
                created: time,
            })?;
        }

        let mut account = AccountObject::new(name.clone(), key, time);
        account.reset_account_delay_days = RESET_ACCOUNT_DELAY_DAYS;
        self.store.create(account)?;
        self.store.create(AccountAuthorityObject {
            id: 0,
            account: name.clone(),
            owner: Authority::from_key(key),
            active: Authority::from_key(key),
            posting: Authority::from_key(key),
            last_owner_update: 0,
        })?;

        self.store.create(ProducerObject {
            id: 0,
            owner: name.clone(),
            signing_key: key,
            url: String::new(),
            active: true,
            created: time,
            total_produced: 0,
            last_confirmed_block_num: 0,
        })?;

        self.store.create(RewardFundObject {
            id: 0,
            symbol: Symbol::coin(),
            content_reward_balance: 0,
            recent_content_claims: 0,
            content_constant: CONTENT_CONSTANT,
            last_update: time,
        })?;

        let supply = self.genesis.init_supply;
        if supply > 0 {
            let coin = Asset::new(supply, Symbol::coin());
            self.adjust_supply(&coin)?;
            self.adjust_liquid_balance(&name, &coin)?;
        }
        Ok(())
    }
}
