use super::{balance::ProxyDeltas, Database};
use crate::core::{
    error::BlockchainError,
    objects::{
        AccountAuthorityObject, AccountObject, AccountRecoveryRequestObject, BalanceKind,
        ChangeRecoveryAccountRequestObject, OwnerAuthorityHistoryObject, RewardFundObject,
    },
    store::{IndexKey, ObjectId},
};
use ezira_common::{
    account::{AccountName, MembershipTier},
    asset::{Asset, Symbol},
    authority::Authority,
    config::{MAX_PROXY_RECURSION_DEPTH, MEMBERSHIP_PERIOD, OWNER_AUTH_RECOVERY_PERIOD},
    time::{TimestampSeconds, TIME_MAX},
};
use log::{debug, info};
use std::collections::BTreeSet;

impl Database {
    /// Every account named by an authority must exist.
    pub fn check_authority_accounts(&self, authority: &Authority) -> Result<(), BlockchainError> {
        for account in authority.account_auths.keys() {
            self.get_account(account)?;
        }
        Ok(())
    }

    /// Replace the owner authority, keeping the old one in the recovery history.
    pub fn update_owner_authority(
        &mut self,
        account: &AccountName,
        owner: Authority,
    ) -> Result<(), BlockchainError> {
        let now = self.head_block_time()?;
        let authority = self.get_account_authority(account)?;
        let id = authority.id;
        let previous = authority.owner.clone();

        self.store.create(OwnerAuthorityHistoryObject {
            id: 0,
            account: account.clone(),
            previous_owner_authority: previous,
            last_valid_time: now,
        })?;
        self.store
            .modify::<AccountAuthorityObject, _>(id, |authority| {
                authority.owner = owner;
                authority.last_owner_update = now;
            })?;
        debug!("owner authority of {} updated", account);
        Ok(())
    }

    /// Record that the accounts signed a transaction at the head time.
    pub(super) fn touch_accounts(&mut self, accounts: &BTreeSet<AccountName>) -> Result<(), BlockchainError> {
        let now = self.head_block_time()?;
        for name in accounts {
            if let Some(account) = self.find_account(name) {
                if account.last_activity != now {
                    let id = account.id;
                    self.store
                        .modify::<AccountObject, _>(id, |account| account.last_activity = now)?;
                }
            }
        }
        Ok(())
    }

    /// Move the voting stake of `account` from its current proxy chain to `proxy`.
    pub fn update_proxy(&mut self, account: &AccountName, proxy: &AccountName) -> Result<(), BlockchainError> {
        let current = self.get_account(account)?;
        if current.proxy == *proxy {
            return Err(BlockchainError::AccountRule("proxy is unchanged"));
        }
        let id = current.id;
        let received = current.proxied_stake;

        if !proxy.is_proxy_to_self() {
            let mut next = self.get_account(proxy)?.proxy.clone();
            let mut terminated = false;
            for _ in 0..MAX_PROXY_RECURSION_DEPTH {
                if next == *account {
                    return Err(BlockchainError::AccountRule("proxy would create a cycle"));
                }
                if next.is_proxy_to_self() {
                    terminated = true;
                    break;
                }
                next = self.get_account(&next)?.proxy.clone();
            }
            if !terminated {
                return Err(BlockchainError::AccountRule("proxy chain is too long"));
            }
        }

        // Own stake at distance zero, stake received through proxies one level further
        let own = self
            .get_balance(account, &Symbol::coin(), BalanceKind::Staked)
            .amount;
        let mut removed: ProxyDeltas = [0; MAX_PROXY_RECURSION_DEPTH + 1];
        removed[0] = -own;
        for (level, stake) in received.iter().enumerate() {
            removed[level + 1] = -stake;
        }
        self.adjust_proxied_stake(account, &removed, 0)?;

        self.store
            .modify::<AccountObject, _>(id, |object| object.proxy = proxy.clone())?;

        let added = removed.map(|delta| -delta);
        self.adjust_proxied_stake(account, &added, 0)?;
        info!("{} now proxies its votes to {:?}", account, proxy.as_str());
        Ok(())
    }

    /// Expire recovery requests and old owner authorities, apply recovery account changes.
    pub(super) fn process_account_recovery(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let expired: Vec<ObjectId> = self
            .store
            .iter_index::<AccountRecoveryRequestObject>(
                AccountRecoveryRequestObject::BY_EXPIRATION,
                &IndexKey::new(),
            )
            .take_while(|request| request.expires <= now)
            .map(|request| request.id)
            .collect();
        for id in expired {
            let request = self.store.remove::<AccountRecoveryRequestObject>(id)?;
            debug!("recovery request of {} expired", request.account_to_recover);
        }

        let history: Vec<ObjectId> = self
            .store
            .iter_index::<OwnerAuthorityHistoryObject>(
                OwnerAuthorityHistoryObject::BY_LAST_VALID,
                &IndexKey::new(),
            )
            .take_while(|entry| entry.last_valid_time.saturating_add(OWNER_AUTH_RECOVERY_PERIOD) <= now)
            .map(|entry| entry.id)
            .collect();
        for id in history {
            self.store.remove::<OwnerAuthorityHistoryObject>(id)?;
        }

        let changes: Vec<ObjectId> = self
            .store
            .iter_index::<ChangeRecoveryAccountRequestObject>(
                ChangeRecoveryAccountRequestObject::BY_EFFECTIVE_DATE,
                &IndexKey::new(),
            )
            .take_while(|request| request.effective_on <= now)
            .map(|request| request.id)
            .collect();
        for id in changes {
            let request = self.store.remove::<ChangeRecoveryAccountRequestObject>(id)?;
            if let Some(account) = self.find_account(&request.account_to_recover) {
                let account_id = account.id;
                self.store.modify::<AccountObject, _>(account_id, |account| {
                    account.recovery_account = request.recovery_account.clone()
                })?;
                info!(
                    "recovery account of {} is now {}",
                    request.account_to_recover, request.recovery_account
                );
            }
        }
        Ok(())
    }

    /// Charge a membership fee from the liquid coin of `account` into the
    /// content reward fund.
    pub fn pay_membership_fee(&mut self, account: &AccountName, amount: i64) -> Result<(), BlockchainError> {
        if amount <= 0 {
            return Ok(());
        }
        let coin = Symbol::coin();
        self.adjust_liquid_balance(account, &Asset::new(-amount, coin.clone()))?;
        let fund_id = self.get_reward_fund(&coin)?.id;
        self.store.modify::<RewardFundObject, _>(fund_id, |fund| {
            fund.content_reward_balance += amount;
        })?;
        Ok(())
    }

    /// Renew recurring memberships that reached their expiration, or drop
    /// them when the account cannot pay another period.
    pub(super) fn process_memberships(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let expired: Vec<ObjectId> = self
            .store
            .iter_index::<AccountObject>(AccountObject::BY_MEMBERSHIP_EXPIRATION, &IndexKey::new())
            .take_while(|account| account.membership_expiration <= now)
            .map(|account| account.id)
            .collect();

        for id in expired {
            let account = self.store.get::<AccountObject>(id)?;
            let name = account.name.clone();
            let tier = account.membership;
            let fee = tier.monthly_fee();
            let renew = account.recurring_membership
                && self.get_balance(&name, &Symbol::coin(), BalanceKind::Liquid).amount >= fee;

            if renew {
                self.pay_membership_fee(&name, fee)?;
                self.store.modify::<AccountObject, _>(id, |account| {
                    account.membership_expiration =
                        account.membership_expiration.saturating_add(MEMBERSHIP_PERIOD);
                })?;
                debug!("{} membership of {} renewed", tier, name);
            } else {
                self.store.modify::<AccountObject, _>(id, |account| {
                    account.membership = MembershipTier::None;
                    account.membership_expiration = TIME_MAX;
                    account.recurring_membership = false;
                })?;
                info!("{} membership of {} expired", tier, name);
            }
        }
        Ok(())
    }
}
