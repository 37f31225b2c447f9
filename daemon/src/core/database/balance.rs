use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::{AccountBalanceObject, AccountObject, AssetObject, BalanceKind},
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    config::MAX_PROXY_RECURSION_DEPTH,
};
use log::{debug, log_enabled, trace, Level};

// Stake deltas by distance from the account whose stake changed
pub(super) type ProxyDeltas = [i64; MAX_PROXY_RECURSION_DEPTH + 1];

impl Database {
    pub fn find_balance(&self, owner: &AccountName, symbol: &Symbol) -> Option<&AccountBalanceObject> {
        self.store.find_by(
            AccountBalanceObject::BY_OWNER_SYMBOL,
            &AccountBalanceObject::owner_symbol_key(owner, symbol),
        )
    }

    pub fn get_balance(&self, owner: &AccountName, symbol: &Symbol, kind: BalanceKind) -> Asset {
        let amount = self
            .find_balance(owner, symbol)
            .map(|balance| balance.get(kind))
            .unwrap_or(0);
        Asset::new(amount, symbol.clone())
    }

    /// Add `delta` to one sub-balance of `owner`, creating the row on first credit.
    ///
    /// Fails with `InsufficientFunds` if the result would be negative. Staked
    /// COIN changes are forwarded to the proxies of the owner.
    pub fn adjust_balance(
        &mut self,
        owner: &AccountName,
        delta: &Asset,
        kind: BalanceKind,
    ) -> Result<(), BlockchainError> {
        if delta.is_zero() {
            return Ok(());
        }
        self.get_asset(&delta.symbol)?;

        let id = match self.find_balance(owner, &delta.symbol) {
            Some(balance) => balance.id,
            None => {
                if delta.amount < 0 {
                    return Err(BlockchainError::InsufficientFunds {
                        account: owner.clone(),
                        kind,
                        available: Asset::zero(delta.symbol.clone()),
                        needed: delta.negated(),
                    });
                }
                let now = self.head_block_time()?;
                self.store.create(AccountBalanceObject::new(
                    owner.clone(),
                    delta.symbol.clone(),
                    now,
                ))?
            }
        };

        let current = self.store.get::<AccountBalanceObject>(id)?.get(kind);
        let updated = current
            .checked_add(delta.amount)
            .ok_or(BlockchainError::Overflow)?;
        if updated < 0 {
            return Err(BlockchainError::InsufficientFunds {
                account: owner.clone(),
                kind,
                available: Asset::new(current, delta.symbol.clone()),
                needed: delta.negated(),
            });
        }

        if log_enabled!(Level::Trace) {
            trace!("{} {} balance of {}: {} -> {}", delta.symbol, kind, owner, current, updated);
        }
        self.store
            .modify::<AccountBalanceObject, _>(id, |balance| *balance.get_mut(kind) = updated)?;

        if kind == BalanceKind::Staked && delta.symbol == Symbol::coin() {
            let mut deltas: ProxyDeltas = [0; MAX_PROXY_RECURSION_DEPTH + 1];
            deltas[0] = delta.amount;
            self.adjust_proxied_stake(owner, &deltas, 0)?;
        }
        Ok(())
    }

    pub fn adjust_liquid_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), BlockchainError> {
        self.adjust_balance(owner, delta, BalanceKind::Liquid)
    }

    pub fn adjust_staked_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), BlockchainError> {
        self.adjust_balance(owner, delta, BalanceKind::Staked)
    }

    pub fn adjust_savings_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), BlockchainError> {
        self.adjust_balance(owner, delta, BalanceKind::Savings)
    }

    pub fn adjust_reward_balance(&mut self, owner: &AccountName, delta: &Asset) -> Result<(), BlockchainError> {
        self.adjust_balance(owner, delta, BalanceKind::Reward)
    }

    /// Debit one balance and credit another, both or neither.
    pub fn transfer_balance(
        &mut self,
        from: &AccountName,
        from_kind: BalanceKind,
        to: &AccountName,
        to_kind: BalanceKind,
        amount: &Asset,
    ) -> Result<(), BlockchainError> {
        self.adjust_balance(from, &amount.negated(), from_kind)?;
        self.adjust_balance(to, amount, to_kind)
    }

    /// Create new units of an asset, bounded by its maximum supply.
    pub fn adjust_supply(&mut self, delta: &Asset) -> Result<(), BlockchainError> {
        let asset = self.get_asset(&delta.symbol)?;
        let id = asset.id;
        let supply = asset
            .total_supply
            .checked_add(delta.amount)
            .ok_or(BlockchainError::Overflow)?;
        if supply > asset.max_supply {
            return Err(BlockchainError::SupplyExceeded {
                symbol: delta.symbol.clone(),
                max: asset.max_supply,
            });
        }
        if supply < 0 {
            return Err(BlockchainError::InvariantViolation(format!(
                "negative supply of {}",
                delta.symbol
            )));
        }

        self.store
            .modify::<AssetObject, _>(id, |asset| asset.total_supply = supply)?;
        debug!("supply of {} is now {}", delta.symbol, supply);
        Ok(())
    }

    /// Largest amount of `symbol` that can still be minted.
    pub fn remaining_supply(&self, symbol: &Symbol) -> Result<i64, BlockchainError> {
        let asset = self.get_asset(symbol)?;
        Ok(asset.max_supply.saturating_sub(asset.total_supply).max(0))
    }

    /// Apply per-level stake deltas to the proxy chain above `account`.
    pub(super) fn adjust_proxied_stake(
        &mut self,
        account: &AccountName,
        deltas: &ProxyDeltas,
        depth: usize,
    ) -> Result<(), BlockchainError> {
        let proxy = self.get_account(account)?.proxy.clone();
        if proxy.is_proxy_to_self() || depth >= MAX_PROXY_RECURSION_DEPTH {
            return Ok(());
        }

        let proxy_account = self.get_account(&proxy)?;
        let id = proxy_account.id;
        let mut proxied = proxy_account.proxied_stake;
        for (level, delta) in deltas.iter().take(MAX_PROXY_RECURSION_DEPTH - depth).enumerate() {
            let slot = &mut proxied[level + depth];
            *slot = slot.checked_add(*delta).ok_or(BlockchainError::Overflow)?;
        }
        self.store
            .modify::<AccountObject, _>(id, |account| account.proxied_stake = proxied)?;

        self.adjust_proxied_stake(&proxy, deltas, depth + 1)
    }

    /// Staked COIN an account votes with: its own unless proxied away, plus
    /// everything proxied to it.
    pub fn voting_stake(&self, account: &AccountObject) -> i64 {
        if !account.proxy.is_proxy_to_self() {
            return 0;
        }
        let own = self.get_balance(&account.name, &Symbol::coin(), BalanceKind::Staked);
        own.amount.saturating_add(account.proxied_total())
    }
}
