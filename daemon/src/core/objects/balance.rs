use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, AssetType, Symbol},
    time::{TimestampSeconds, TIME_MAX},
};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Sub-balance of an account balance object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BalanceKind {
    Liquid,
    Staked,
    Savings,
    Reward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetObject {
    pub id: ObjectId,
    pub symbol: Symbol,
    pub asset_type: AssetType,
    pub issuer: AccountName,
    // Every unit in existence, wherever it is held
    pub total_supply: i64,
    pub max_supply: i64,
    // Weekly payments an unstake is split into
    pub unstake_intervals: u16,
    // Yearly rates in basis points, credit assets only
    pub liquid_interest_rate: u16,
    pub staked_interest_rate: u16,
    pub savings_interest_rate: u16,
    pub created: TimestampSeconds,
}

impl_object!(AssetObject, Table::Assets, {
    BY_SYMBOL: unique => |o| AssetObject::symbol_key(&o.symbol),
});

impl AssetObject {
    pub fn symbol_key(symbol: &Symbol) -> IndexKey {
        IndexKey::new().with_str(symbol.as_str())
    }

    pub fn has_interest(&self) -> bool {
        self.asset_type == AssetType::Credit
            && (self.liquid_interest_rate > 0
                || self.staked_interest_rate > 0
                || self.savings_interest_rate > 0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountBalanceObject {
    pub id: ObjectId,
    pub owner: AccountName,
    pub symbol: Symbol,
    pub liquid: i64,
    pub staked: i64,
    pub savings: i64,
    pub reward: i64,
    // Amount paid out of the staked balance on each unstake interval
    pub unstake_rate: i64,
    pub to_unstake: i64,
    pub unstaked: i64,
    pub next_unstake_time: TimestampSeconds,
    pub last_interest_time: TimestampSeconds,
}

impl_object!(AccountBalanceObject, Table::Balances, {
    BY_OWNER_SYMBOL: unique => |o| AccountBalanceObject::owner_symbol_key(&o.owner, &o.symbol),
    BY_SYMBOL: unique => |o| AccountBalanceObject::symbol_key(&o.symbol).with_str(o.owner.as_str()),
    BY_NEXT_UNSTAKE: non_unique => |o| IndexKey::new().with_time(o.next_unstake_time),
});

impl AccountBalanceObject {
    pub fn new(owner: AccountName, symbol: Symbol, time: TimestampSeconds) -> Self {
        Self {
            id: 0,
            owner,
            symbol,
            liquid: 0,
            staked: 0,
            savings: 0,
            reward: 0,
            unstake_rate: 0,
            to_unstake: 0,
            unstaked: 0,
            next_unstake_time: TIME_MAX,
            last_interest_time: time,
        }
    }

    pub fn owner_symbol_key(owner: &AccountName, symbol: &Symbol) -> IndexKey {
        IndexKey::new()
            .with_str(owner.as_str())
            .with_str(symbol.as_str())
    }

    pub fn symbol_key(symbol: &Symbol) -> IndexKey {
        IndexKey::new().with_str(symbol.as_str())
    }

    pub fn get(&self, kind: BalanceKind) -> i64 {
        match kind {
            BalanceKind::Liquid => self.liquid,
            BalanceKind::Staked => self.staked,
            BalanceKind::Savings => self.savings,
            BalanceKind::Reward => self.reward,
        }
    }

    pub fn get_mut(&mut self, kind: BalanceKind) -> &mut i64 {
        match kind {
            BalanceKind::Liquid => &mut self.liquid,
            BalanceKind::Staked => &mut self.staked,
            BalanceKind::Savings => &mut self.savings,
            BalanceKind::Reward => &mut self.reward,
        }
    }

    pub fn asset(&self, kind: BalanceKind) -> Asset {
        Asset::new(self.get(kind), self.symbol.clone())
    }

    pub fn is_unstaking(&self) -> bool {
        self.unstake_rate > 0
    }

    pub fn total(&self) -> Option<i64> {
        self.liquid
            .checked_add(self.staked)?
            .checked_add(self.savings)?
            .checked_add(self.reward)
    }
}
