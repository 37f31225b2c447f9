use super::Evaluator;
use crate::core::{
    database::Database,
    error::BlockchainError,
    objects::{
        AccountAuthorityObject, AccountObject, AccountRecoveryRequestObject,
        ChangeRecoveryAccountRequestObject, OwnerAuthorityHistoryObject,
    },
};
use ezira_common::{
    account::MembershipTier,
    config::{
        ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD, MEMBERSHIP_PERIOD, MIN_ACCOUNT_CREATION_FEE,
        OWNER_AUTH_RECOVERY_PERIOD, OWNER_UPDATE_LIMIT, RESET_ACCOUNT_DELAY_DAYS,
    },
    operation::{
        AccountCreateOperation, AccountMembershipOperation, AccountUpdateOperation,
        AccountUpdateProxyOperation,
        ChangeRecoveryAccountOperation, RecoverAccountOperation,
        RequestAccountRecoveryOperation, ResetAccountOperation, SetResetAccountOperation,
    },
    time::{SECONDS_PER_DAY, TIME_MAX},
};
use log::info;

impl Evaluator for AccountCreateOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.get_account(&self.creator)?;
        if self.fee.amount < MIN_ACCOUNT_CREATION_FEE {
            return Err(BlockchainError::AccountRule("account creation fee is too low"));
        }
        if db.find_account(&self.new_account_name).is_some() {
            return Err(BlockchainError::AccountExists(self.new_account_name.clone()));
        }
        for authority in [&self.owner, &self.active, &self.posting] {
            db.check_authority_accounts(authority)?;
        }

        let now = db.head_block_time()?;
        let mut account = AccountObject::new(self.new_account_name.clone(), self.memo_key, now);
        account.json_metadata = self.json_metadata.clone();
        account.recovery_account = self.creator.clone();
        account.reset_account = self.creator.clone();
        account.reset_account_delay_days = RESET_ACCOUNT_DELAY_DAYS;

        let store = db.store_mut();
        store.create(account)?;
        store.create(AccountAuthorityObject {
            id: 0,
            account: self.new_account_name.clone(),
            owner: self.owner.clone(),
            active: self.active.clone(),
            posting: self.posting.clone(),
            last_owner_update: 0,
        })?;

        db.adjust_liquid_balance(&self.creator, &self.fee.negated())?;
        db.adjust_staked_balance(&self.new_account_name, &self.fee)?;
        info!("account {} created by {}", self.new_account_name, self.creator);
        Ok(())
    }
}

impl Evaluator for AccountUpdateOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let account_id = db.get_account(&self.account)?.id;
        let authority = db.get_account_authority(&self.account)?;
        let authority_id = authority.id;

        if let Some(owner) = &self.owner {
            let next = authority.last_owner_update.saturating_add(OWNER_UPDATE_LIMIT);
            if now < next {
                return Err(BlockchainError::OwnerUpdateTooSoon {
                    account: self.account.clone(),
                    next,
                });
            }
            db.check_authority_accounts(owner)?;
            db.update_owner_authority(&self.account, owner.clone())?;
        }

        for authority in [&self.active, &self.posting].into_iter().flatten() {
            db.check_authority_accounts(authority)?;
        }
        if self.active.is_some() || self.posting.is_some() {
            db.store_mut()
                .modify::<AccountAuthorityObject, _>(authority_id, |authority| {
                    if let Some(active) = &self.active {
                        authority.active = active.clone();
                    }
                    if let Some(posting) = &self.posting {
                        authority.posting = posting.clone();
                    }
                })?;
        }

        db.store_mut().modify::<AccountObject, _>(account_id, |account| {
            if let Some(memo_key) = self.memo_key {
                account.memo_key = memo_key;
            }
            if !self.json_metadata.is_empty() {
                account.json_metadata = self.json_metadata.clone();
            }
            account.last_account_update = now;
        })?;
        Ok(())
    }
}

impl Evaluator for AccountUpdateProxyOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.update_proxy(&self.account, &self.proxy)
    }
}

impl Evaluator for RequestAccountRecoveryOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.recovery_account)?;
        let account = db.get_account(&self.account_to_recover)?;
        if account.recovery_account != self.recovery_account {
            return Err(BlockchainError::RecoveryRule(
                "only the recovery account can request a recovery",
            ));
        }

        let existing = db
            .store()
            .find_by::<AccountRecoveryRequestObject>(
                AccountRecoveryRequestObject::BY_ACCOUNT,
                &AccountObject::name_key(&self.account_to_recover),
            )
            .map(|request| request.id);

        if self.is_cancel() {
            let id = existing.ok_or(BlockchainError::RecoveryRule("no recovery request to cancel"))?;
            db.store_mut().remove::<AccountRecoveryRequestObject>(id)?;
            info!("recovery request of {} cancelled", self.account_to_recover);
            return Ok(());
        }

        db.check_authority_accounts(&self.new_owner_authority)?;
        let expires = now.saturating_add(ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD);
        match existing {
            Some(id) => {
                db.store_mut()
                    .modify::<AccountRecoveryRequestObject, _>(id, |request| {
                        request.new_owner_authority = self.new_owner_authority.clone();
                        request.expires = expires;
                    })?;
            }
            None => {
                db.store_mut().create(AccountRecoveryRequestObject {
                    id: 0,
                    account_to_recover: self.account_to_recover.clone(),
                    new_owner_authority: self.new_owner_authority.clone(),
                    expires,
                })?;
            }
        }
        info!(
            "{} requested the recovery of {}",
            self.recovery_account, self.account_to_recover
        );
        Ok(())
    }
}

impl Evaluator for RecoverAccountOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let account = db.get_account(&self.account_to_recover)?;
        let account_id = account.id;
        let next = account.last_account_recovery.saturating_add(OWNER_UPDATE_LIMIT);
        if account.last_account_recovery > 0 && now < next {
            return Err(BlockchainError::OwnerUpdateTooSoon {
                account: self.account_to_recover.clone(),
                next,
            });
        }

        let name_key = AccountObject::name_key(&self.account_to_recover);
        let request = db
            .store()
            .find_by::<AccountRecoveryRequestObject>(AccountRecoveryRequestObject::BY_ACCOUNT, &name_key)
            .ok_or(BlockchainError::RecoveryRule("no recovery request"))?;
        if request.new_owner_authority != self.new_owner_authority {
            return Err(BlockchainError::RecoveryRule(
                "new owner authority does not match the request",
            ));
        }
        let request_id = request.id;

        let recent = db
            .store()
            .iter_index::<OwnerAuthorityHistoryObject>(OwnerAuthorityHistoryObject::BY_ACCOUNT, &name_key)
            .any(|entry| {
                entry.previous_owner_authority == self.recent_owner_authority
                    && entry.last_valid_time.saturating_add(OWNER_AUTH_RECOVERY_PERIOD) > now
            });
        if !recent {
            return Err(BlockchainError::RecoveryRule(
                "recent owner authority is not in the recent history",
            ));
        }

        db.store_mut().remove::<AccountRecoveryRequestObject>(request_id)?;
        db.update_owner_authority(&self.account_to_recover, self.new_owner_authority.clone())?;
        db.store_mut()
            .modify::<AccountObject, _>(account_id, |account| account.last_account_recovery = now)?;
        info!("account {} recovered", self.account_to_recover);
        Ok(())
    }
}

impl Evaluator for ChangeRecoveryAccountOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.new_recovery_account)?;
        let current = db.get_account(&self.account_to_recover)?.recovery_account.clone();

        let existing = db
            .store()
            .find_by::<ChangeRecoveryAccountRequestObject>(
                ChangeRecoveryAccountRequestObject::BY_ACCOUNT,
                &AccountObject::name_key(&self.account_to_recover),
            )
            .map(|request| request.id);

        if current == self.new_recovery_account {
            // Changing back to the current partner drops the pending change
            if let Some(id) = existing {
                db.store_mut().remove::<ChangeRecoveryAccountRequestObject>(id)?;
            }
            return Ok(());
        }

        let effective_on = now.saturating_add(OWNER_AUTH_RECOVERY_PERIOD);
        match existing {
            Some(id) => {
                db.store_mut()
                    .modify::<ChangeRecoveryAccountRequestObject, _>(id, |request| {
                        request.recovery_account = self.new_recovery_account.clone();
                        request.effective_on = effective_on;
                    })?;
            }
            None => {
                db.store_mut().create(ChangeRecoveryAccountRequestObject {
                    id: 0,
                    account_to_recover: self.account_to_recover.clone(),
                    recovery_account: self.new_recovery_account.clone(),
                    effective_on,
                })?;
            }
        }
        Ok(())
    }
}

impl Evaluator for SetResetAccountOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let account = db.get_account(&self.account)?;
        if account.reset_account != self.current_reset_account {
            return Err(BlockchainError::AccountRule("current reset account does not match"));
        }
        let id = account.id;
        db.get_account(&self.reset_account)?;

        db.store_mut().modify::<AccountObject, _>(id, |account| {
            account.reset_account = self.reset_account.clone();
            account.reset_account_delay_days = self.days;
        })?;
        Ok(())
    }
}

impl Evaluator for ResetAccountOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let account = db.get_account(&self.account_to_reset)?;
        if account.reset_account.is_empty() || account.reset_account != self.reset_account {
            return Err(BlockchainError::AccountRule("not the reset account of this account"));
        }
        let delay = account.reset_account_delay_days as u64 * SECONDS_PER_DAY;
        if now < account.last_activity.saturating_add(delay) {
            return Err(BlockchainError::AccountRule("account was active during the reset delay"));
        }

        db.check_authority_accounts(&self.new_owner_authority)?;
        db.update_owner_authority(&self.account_to_reset, self.new_owner_authority.clone())?;
        info!("owner authority of {} reset by {}", self.account_to_reset, self.reset_account);
        Ok(())
    }
}

impl Evaluator for AccountMembershipOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let account = db.get_account(&self.account)?;
        let id = account.id;

        if self.membership == MembershipTier::None {
            if account.membership == MembershipTier::None {
                return Err(BlockchainError::AccountRule("no membership to cancel"));
            }
            db.store_mut().modify::<AccountObject, _>(id, |account| {
                account.membership = MembershipTier::None;
                account.membership_expiration = TIME_MAX;
                account.recurring_membership = false;
            })?;
            info!("{} cancelled its membership", self.account);
            return Ok(());
        }

        // The unused part of the current membership is credited to the new one
        let carried = if account.membership_expiration > now && account.membership_expiration != TIME_MAX {
            let remaining = account.membership_expiration - now;
            (account.membership.monthly_fee() as i128 * remaining as i128 / MEMBERSHIP_PERIOD as i128) as i64
        } else {
            0
        };
        let total = self
            .membership
            .monthly_fee()
            .checked_mul(self.months as i64)
            .ok_or(BlockchainError::Overflow)?;
        let fee = total.saturating_sub(carried).max(0);

        db.pay_membership_fee(&self.account, fee)?;
        let expiration = now.saturating_add(MEMBERSHIP_PERIOD * self.months as u64);
        db.store_mut().modify::<AccountObject, _>(id, |account| {
            account.membership = self.membership;
            account.membership_expiration = expiration;
            account.recurring_membership = self.recurring;
        })?;
        info!("{} bought {} membership until {}, paying {}", self.account, self.membership, expiration, fee);
        Ok(())
    }
}
