use super::Evaluator;
use crate::core::{
    database::Database,
    error::BlockchainError,
    objects::{
        AccountBalanceObject, BalanceKind, RecurringTransferObject, SavingsWithdrawObject,
        UnstakeRouteObject,
    },
};
use ezira_common::{
    asset::Asset,
    config::{
        MAX_WITHDRAW_ROUTES, PERCENT_100, SAVINGS_WITHDRAW_REQUEST_LIMIT, SAVINGS_WITHDRAW_TIME,
        STAKE_WITHDRAW_INTERVAL,
    },
    operation::{
        ClaimRewardBalanceOperation, StakeAssetOperation, TransferFromSavingsOperation,
        TransferOperation, TransferRecurringOperation, TransferToSavingsOperation,
        UnstakeAssetOperation, UnstakeAssetRouteOperation,
    },
    time::TIME_MAX,
};
use log::{debug, info};

impl Evaluator for TransferOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.from)?;
        db.get_account(&self.to)?;
        db.transfer_balance(
            &self.from,
            BalanceKind::Liquid,
            &self.to,
            BalanceKind::Liquid,
            &self.amount,
        )
    }
}

impl Evaluator for TransferToSavingsOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.from)?;
        db.get_account(&self.to)?;
        db.transfer_balance(
            &self.from,
            BalanceKind::Liquid,
            &self.to,
            BalanceKind::Savings,
            &self.amount,
        )
    }
}

impl Evaluator for TransferFromSavingsOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.from)?;
        let existing = db
            .find_savings_withdraw(&self.from, &self.request_id)
            .map(|withdraw| (withdraw.id, withdraw.amount.clone()));

        if !self.transferred {
            let (id, _) = existing.ok_or_else(|| BlockchainError::UnknownSavingsWithdraw {
                from: self.from.clone(),
                request_id: self.request_id.clone(),
            })?;
            let withdraw = db.store_mut().remove::<SavingsWithdrawObject>(id)?;
            db.adjust_savings_balance(&self.from, &withdraw.amount)?;
            debug!("savings withdrawal {} of {} cancelled", self.request_id, self.from);
            return Ok(());
        }

        db.get_account(&self.to)?;
        let complete = now.saturating_add(SAVINGS_WITHDRAW_TIME);
        match existing {
            Some((id, previous)) => {
                db.adjust_savings_balance(&self.from, &previous)?;
                db.adjust_savings_balance(&self.from, &self.amount.negated())?;
                db.store_mut()
                    .modify::<SavingsWithdrawObject, _>(id, |withdraw| {
                        withdraw.to = self.to.clone();
                        withdraw.amount = self.amount.clone();
                        withdraw.memo = self.memo.clone();
                        withdraw.complete = complete;
                    })?;
            }
            None => {
                let prefix = SavingsWithdrawObject::from_key(&self.from);
                let open = db
                    .store()
                    .iter_index::<SavingsWithdrawObject>(SavingsWithdrawObject::BY_FROM_REQUEST, &prefix)
                    .count();
                if open >= SAVINGS_WITHDRAW_REQUEST_LIMIT as usize {
                    return Err(BlockchainError::LimitReached {
                        what: "savings withdrawals",
                        limit: SAVINGS_WITHDRAW_REQUEST_LIMIT as usize,
                    });
                }

                db.adjust_savings_balance(&self.from, &self.amount.negated())?;
                db.store_mut().create(SavingsWithdrawObject {
                    id: 0,
                    from: self.from.clone(),
                    to: self.to.clone(),
                    amount: self.amount.clone(),
                    request_id: self.request_id.clone(),
                    memo: self.memo.clone(),
                    complete,
                })?;
            }
        }
        Ok(())
    }
}

impl Evaluator for StakeAssetOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.from)?;
        db.get_account(&self.to)?;
        db.transfer_balance(
            &self.from,
            BalanceKind::Liquid,
            &self.to,
            BalanceKind::Staked,
            &self.amount,
        )
    }
}

impl Evaluator for UnstakeAssetOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.account)?;
        let intervals = db.get_asset(&self.amount.symbol)?.unstake_intervals.max(1);

        let Some(balance) = db.find_balance(&self.account, &self.amount.symbol) else {
            return Err(BlockchainError::InsufficientFunds {
                account: self.account.clone(),
                kind: BalanceKind::Staked,
                available: Asset::zero(self.amount.symbol.clone()),
                needed: self.amount.clone(),
            });
        };
        let id = balance.id;

        if self.amount.is_zero() {
            if !balance.is_unstaking() {
                return Err(BlockchainError::TransferRule("no unstake in progress"));
            }
            db.store_mut()
                .modify::<AccountBalanceObject, _>(id, |balance| {
                    balance.unstake_rate = 0;
                    balance.to_unstake = 0;
                    balance.unstaked = 0;
                    balance.next_unstake_time = TIME_MAX;
                })?;
            debug!("{} stopped unstaking {}", self.account, self.amount.symbol);
            return Ok(());
        }

        if balance.staked < self.amount.amount {
            return Err(BlockchainError::InsufficientFunds {
                account: self.account.clone(),
                kind: BalanceKind::Staked,
                available: balance.asset(BalanceKind::Staked),
                needed: self.amount.clone(),
            });
        }

        let rate = (self.amount.amount / intervals as i64).max(1);
        let amount = self.amount.amount;
        db.store_mut()
            .modify::<AccountBalanceObject, _>(id, |balance| {
                balance.unstake_rate = rate;
                balance.to_unstake = amount;
                balance.unstaked = 0;
                balance.next_unstake_time = now.saturating_add(STAKE_WITHDRAW_INTERVAL);
            })?;
        info!("{} unstakes {} over {} intervals", self.account, self.amount, intervals);
        Ok(())
    }
}

impl Evaluator for UnstakeAssetRouteOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.from)?;
        db.get_account(&self.to)?;

        let existing = db
            .store()
            .find_by::<UnstakeRouteObject>(
                UnstakeRouteObject::BY_ROUTE,
                &UnstakeRouteObject::route_key(&self.from, &self.to),
            )
            .map(|route| route.id);

        if self.percent == 0 {
            let id = existing.ok_or(BlockchainError::TransferRule("unknown unstake route"))?;
            db.store_mut().remove::<UnstakeRouteObject>(id)?;
            return Ok(());
        }

        match existing {
            Some(id) => {
                db.store_mut().modify::<UnstakeRouteObject, _>(id, |route| {
                    route.percent = self.percent;
                    route.auto_stake = self.auto_stake;
                })?;
            }
            None => {
                let prefix = UnstakeRouteObject::from_key(&self.from);
                let routes = db
                    .store()
                    .iter_index::<UnstakeRouteObject>(UnstakeRouteObject::BY_ROUTE, &prefix)
                    .count();
                if routes >= MAX_WITHDRAW_ROUTES as usize {
                    return Err(BlockchainError::LimitReached {
                        what: "unstake routes",
                        limit: MAX_WITHDRAW_ROUTES as usize,
                    });
                }
                db.store_mut().create(UnstakeRouteObject {
                    id: 0,
                    from: self.from.clone(),
                    to: self.to.clone(),
                    percent: self.percent,
                    auto_stake: self.auto_stake,
                })?;
            }
        }

        let prefix = UnstakeRouteObject::from_key(&self.from);
        let total: u32 = db
            .store()
            .iter_index::<UnstakeRouteObject>(UnstakeRouteObject::BY_ROUTE, &prefix)
            .map(|route| route.percent as u32)
            .sum();
        if total > PERCENT_100 as u32 {
            return Err(BlockchainError::TransferRule("unstake routes exceed 100%"));
        }
        Ok(())
    }
}

impl Evaluator for ClaimRewardBalanceOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.account)?;
        db.transfer_balance(
            &self.account,
            BalanceKind::Reward,
            &self.account,
            BalanceKind::Liquid,
            &self.reward,
        )
    }
}

impl Evaluator for TransferRecurringOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.from)?;
        let existing = db
            .find_recurring_transfer(&self.from, &self.transfer_id)
            .map(|transfer| transfer.id);

        if !self.active {
            let id = existing.ok_or_else(|| BlockchainError::UnknownRecurringTransfer {
                from: self.from.clone(),
                transfer_id: self.transfer_id.clone(),
            })?;
            db.store_mut().remove::<RecurringTransferObject>(id)?;
            info!("recurring transfer {} of {} cancelled", self.transfer_id, self.from);
            return Ok(());
        }

        db.get_account(&self.to)?;
        db.get_asset(&self.amount.symbol)?;
        if self.begin < now {
            return Err(BlockchainError::TransferRule("recurring transfer begins in the past"));
        }
        let end = self.end().ok_or(BlockchainError::Overflow)?;
        let available = db.get_balance(&self.from, &self.amount.symbol, BalanceKind::Liquid);
        if available.amount < self.amount.amount {
            return Err(BlockchainError::InsufficientFunds {
                account: self.from.clone(),
                kind: BalanceKind::Liquid,
                available,
                needed: self.amount.clone(),
            });
        }

        let transfer = RecurringTransferObject {
            id: 0,
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount.clone(),
            transfer_id: self.transfer_id.clone(),
            memo: self.memo.clone(),
            begin: self.begin,
            end,
            interval: self.interval,
            next_transfer: self.begin,
            payments_remaining: self.payments,
            extensible: self.extensible,
            fill_or_kill: self.fill_or_kill,
        };
        match existing {
            Some(id) => {
                db.store_mut()
                    .modify::<RecurringTransferObject, _>(id, |current| {
                        *current = RecurringTransferObject { id, ..transfer };
                    })?;
                debug!("recurring transfer {} of {} updated", self.transfer_id, self.from);
            }
            None => {
                db.store_mut().create(transfer)?;
                info!(
                    "{} pays {} to {} every {}s, {} times",
                    self.from, self.amount, self.to, self.interval, self.payments
                );
            }
        }
        Ok(())
    }
}
