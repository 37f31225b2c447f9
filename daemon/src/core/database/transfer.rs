use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::{
        AccountBalanceObject, BalanceKind, RecurringTransferObject, SavingsWithdrawObject,
        UnstakeRouteObject,
    },
    store::{IndexKey, ObjectId},
};
use ezira_common::{
    asset::Asset,
    config::STAKE_WITHDRAW_INTERVAL,
    time::{TimestampSeconds, TIME_MAX},
};
use log::{debug, info, log_enabled, Level};

// Outcome of one scheduled payment of a recurring transfer
enum RecurringTick {
    Paid,
    Failed,
}

impl Database {
    /// Pay the next interval of every running unstake.
    pub(super) fn process_unstaking(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let due: Vec<ObjectId> = self
            .store
            .iter_index::<AccountBalanceObject>(AccountBalanceObject::BY_NEXT_UNSTAKE, &IndexKey::new())
            .take_while(|balance| balance.next_unstake_time <= now)
            .map(|balance| balance.id)
            .collect();

        for id in due {
            let balance = self.store.get::<AccountBalanceObject>(id)?;
            let owner = balance.owner.clone();
            let symbol = balance.symbol.clone();
            let remaining = balance.to_unstake.saturating_sub(balance.unstaked);
            let amount = balance.unstake_rate.min(remaining).min(balance.staked);

            if amount > 0 {
                let payment = Asset::new(amount, symbol.clone());
                self.adjust_staked_balance(&owner, &payment.negated())?;

                let routes: Vec<UnstakeRouteObject> = self
                    .store
                    .iter_index::<UnstakeRouteObject>(
                        UnstakeRouteObject::BY_ROUTE,
                        &UnstakeRouteObject::from_key(&owner),
                    )
                    .cloned()
                    .collect();
                let mut left = payment.clone();
                for route in routes {
                    let share = payment.percent(route.percent);
                    if share.is_zero() {
                        continue;
                    }
                    let kind = if route.auto_stake {
                        BalanceKind::Staked
                    } else {
                        BalanceKind::Liquid
                    };
                    self.adjust_balance(&route.to, &share, kind)?;
                    left = left.checked_sub(&share).ok_or(BlockchainError::Overflow)?;
                }
                self.adjust_liquid_balance(&owner, &left)?;

                if log_enabled!(Level::Debug) {
                    debug!("{} unstaked {}", owner, payment);
                }
            }

            self.store.modify::<AccountBalanceObject, _>(id, |balance| {
                balance.unstaked += amount;
                if amount == 0 || balance.unstaked >= balance.to_unstake || balance.staked == 0 {
                    balance.unstake_rate = 0;
                    balance.to_unstake = 0;
                    balance.unstaked = 0;
                    balance.next_unstake_time = TIME_MAX;
                } else {
                    balance.next_unstake_time = balance.next_unstake_time.saturating_add(STAKE_WITHDRAW_INTERVAL);
                }
            })?;
        }
        Ok(())
    }

    /// Credit the savings withdrawals that completed.
    pub(super) fn process_savings_withdraws(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let due: Vec<ObjectId> = self
            .store
            .iter_index::<SavingsWithdrawObject>(SavingsWithdrawObject::BY_COMPLETE, &IndexKey::new())
            .take_while(|withdraw| withdraw.complete <= now)
            .map(|withdraw| withdraw.id)
            .collect();

        for id in due {
            let withdraw = self.store.remove::<SavingsWithdrawObject>(id)?;
            self.adjust_liquid_balance(&withdraw.to, &withdraw.amount)?;
            debug!(
                "savings withdrawal {} of {} completed: {} to {}",
                withdraw.request_id, withdraw.from, withdraw.amount, withdraw.to
            );
        }
        Ok(())
    }

    /// Run every recurring transfer whose next payment is due.
    ///
    /// A payment without enough liquid funds is skipped, pushes the schedule
    /// back by one interval when the transfer is extensible, or cancels a
    /// fill or kill transfer.
    pub(super) fn process_recurring_transfers(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let due: Vec<ObjectId> = self
            .store
            .iter_index::<RecurringTransferObject>(RecurringTransferObject::BY_NEXT_TRANSFER, &IndexKey::new())
            .take_while(|transfer| transfer.next_transfer <= now)
            .map(|transfer| transfer.id)
            .collect();

        for id in due {
            let transfer = self.store.get::<RecurringTransferObject>(id)?.clone();
            let available = self.get_balance(&transfer.from, &transfer.amount.symbol, BalanceKind::Liquid);

            let tick = if available.amount >= transfer.amount.amount {
                self.transfer_balance(
                    &transfer.from,
                    BalanceKind::Liquid,
                    &transfer.to,
                    BalanceKind::Liquid,
                    &transfer.amount,
                )?;
                RecurringTick::Paid
            } else {
                RecurringTick::Failed
            };

            match tick {
                RecurringTick::Failed if transfer.fill_or_kill => {
                    self.store.remove::<RecurringTransferObject>(id)?;
                    info!(
                        "recurring transfer {} of {} cancelled: {} not available",
                        transfer.transfer_id, transfer.from, transfer.amount
                    );
                }
                RecurringTick::Failed if transfer.extensible => {
                    self.store.modify::<RecurringTransferObject, _>(id, |transfer| {
                        transfer.next_transfer = transfer.next_transfer.saturating_add(transfer.interval);
                        transfer.end = transfer.end.saturating_add(transfer.interval);
                    })?;
                    debug!(
                        "recurring transfer {} of {} extended by one interval",
                        transfer.transfer_id, transfer.from
                    );
                }
                tick => {
                    if matches!(tick, RecurringTick::Failed) {
                        debug!(
                            "recurring transfer {} of {} skipped a payment",
                            transfer.transfer_id, transfer.from
                        );
                    }
                    if transfer.payments_remaining <= 1 {
                        self.store.remove::<RecurringTransferObject>(id)?;
                        debug!("recurring transfer {} of {} completed", transfer.transfer_id, transfer.from);
                    } else {
                        self.store.modify::<RecurringTransferObject, _>(id, |transfer| {
                            transfer.payments_remaining -= 1;
                            transfer.next_transfer = transfer.next_transfer.saturating_add(transfer.interval);
                        })?;
                    }
                }
            }
        }
        Ok(())
    }
}
