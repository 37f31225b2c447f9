use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::{AccountBalanceObject, AssetObject, BalanceKind},
    store::ObjectId,
};
use ezira_common::{
    asset::Asset,
    config::PERCENT_100,
    time::{DurationSeconds, TimestampSeconds, SECONDS_PER_YEAR},
};
use log::{debug, log_enabled, trace, Level};
use primitive_types::U256;

/// Interest earned by `amount` at a yearly `rate` in basis points over `elapsed` seconds.
pub fn accrued_interest(amount: i64, rate: u16, elapsed: DurationSeconds) -> i64 {
    if amount <= 0 || rate == 0 || elapsed == 0 {
        return 0;
    }
    let interest = U256::from(amount as u64) * U256::from(rate) * U256::from(elapsed)
        / (U256::from(PERCENT_100) * U256::from(SECONDS_PER_YEAR));
    if interest > U256::from(i64::MAX as u64) {
        i64::MAX
    } else {
        interest.as_u64() as i64
    }
}

impl Database {
    /// Credit the interest of every interest bearing asset since the last payment.
    ///
    /// Interest is minted and is not bounded by the maximum supply.
    pub(super) fn process_interest(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let assets: Vec<AssetObject> = self
            .store
            .iter::<AssetObject>()
            .filter(|asset| asset.has_interest())
            .cloned()
            .collect();

        for asset in assets {
            let rates = [
                (BalanceKind::Liquid, asset.liquid_interest_rate),
                (BalanceKind::Staked, asset.staked_interest_rate),
                (BalanceKind::Savings, asset.savings_interest_rate),
            ];
            let prefix = AccountBalanceObject::symbol_key(&asset.symbol);
            let balances: Vec<ObjectId> = self
                .store
                .iter_index::<AccountBalanceObject>(AccountBalanceObject::BY_SYMBOL, &prefix)
                .map(|balance| balance.id)
                .collect();

            let mut minted: i64 = 0;
            for id in balances {
                let balance = self.store.get::<AccountBalanceObject>(id)?;
                let owner = balance.owner.clone();
                let elapsed = now.saturating_sub(balance.last_interest_time);
                let earned: Vec<(BalanceKind, i64)> = rates
                    .iter()
                    .map(|(kind, rate)| (*kind, accrued_interest(balance.get(*kind), *rate, elapsed)))
                    .filter(|(_, interest)| *interest > 0)
                    .collect();

                for (kind, interest) in earned {
                    if log_enabled!(Level::Trace) {
                        trace!("{} {} interest for {}: {}", asset.symbol, kind, owner, interest);
                    }
                    self.adjust_balance(&owner, &Asset::new(interest, asset.symbol.clone()), kind)?;
                    minted = minted.checked_add(interest).ok_or(BlockchainError::Overflow)?;
                }
                self.store
                    .modify::<AccountBalanceObject, _>(id, |balance| balance.last_interest_time = now)?;
            }

            if minted > 0 {
                let supply = asset
                    .total_supply
                    .checked_add(minted)
                    .ok_or(BlockchainError::Overflow)?;
                self.store
                    .modify::<AssetObject, _>(asset.id, |asset| asset.total_supply = supply)?;
                if log_enabled!(Level::Debug) {
                    debug!("minted {} {} of interest", minted, asset.symbol);
                }
            }
        }
        Ok(())
    }
}
