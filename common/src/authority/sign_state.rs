use super::{Authority, AuthorityLevel, RequiredAuthorities};
use crate::{account::AccountName, crypto::PublicKey, error::AuthorityError};
use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// Source of account authorities used while verifying signatures.
pub trait AuthorityProvider {
    // None if the account does not exist
    fn get_authority(&self, account: &AccountName, level: AuthorityLevel) -> Option<Authority>;
}

/// Tracks which provided keys were used while authorities are evaluated.
///
/// Account references are resolved lazily through the provider, at most
/// `max_recursion` levels deep. Approved accounts are cached per level so a
/// shared co-signer is only resolved once.
pub struct SignState<'a, P: AuthorityProvider + ?Sized> {
    provider: &'a P,
    // provided key -> used
    provided: BTreeMap<PublicKey, bool>,
    approved: BTreeSet<(AccountName, AuthorityLevel)>,
    max_recursion: u32,
}

impl<'a, P: AuthorityProvider + ?Sized> SignState<'a, P> {
    pub fn new(
        provider: &'a P,
        keys: &[PublicKey],
        max_recursion: u32,
    ) -> Result<Self, AuthorityError> {
        let mut provided = BTreeMap::new();
        for key in keys {
            if provided.insert(*key, false).is_some() {
                return Err(AuthorityError::DuplicateSignature(key.to_hex()));
            }
        }

        Ok(Self {
            provider,
            provided,
            approved: BTreeSet::new(),
            max_recursion,
        })
    }

    fn signed_by(&mut self, key: &PublicKey) -> bool {
        match self.provided.get_mut(key) {
            Some(used) => {
                *used = true;
                true
            }
            None => false,
        }
    }

    fn nested_level(level: AuthorityLevel) -> AuthorityLevel {
        // Posting references resolve to posting, everything else to active
        match level {
            AuthorityLevel::Posting => AuthorityLevel::Posting,
            _ => AuthorityLevel::Active,
        }
    }

    /// Whether the provided keys satisfy the authority.
    ///
    /// Stops as soon as the threshold is reached, so keys beyond that point
    /// stay unused.
    pub fn check_authority(
        &mut self,
        authority: &Authority,
        level: AuthorityLevel,
        depth: u32,
    ) -> Result<bool, AuthorityError> {
        let threshold = authority.weight_threshold as u64;
        let mut total: u64 = 0;

        for (key, weight) in &authority.key_auths {
            if self.signed_by(key) {
                total += *weight as u64;
                if total >= threshold {
                    return Ok(true);
                }
            }
        }

        let nested = Self::nested_level(level);
        for (account, weight) in &authority.account_auths {
            let key = (account.clone(), nested);
            if !self.approved.contains(&key) {
                if depth >= self.max_recursion {
                    continue;
                }

                let sub = self
                    .provider
                    .get_authority(account, nested)
                    .ok_or_else(|| AuthorityError::UnknownAccount(account.clone()))?;
                if !self.check_authority(&sub, nested, depth + 1)? {
                    continue;
                }
                self.approved.insert(key);
            }

            total += *weight as u64;
            if total >= threshold {
                return Ok(true);
            }
        }

        Ok(total >= threshold)
    }

    /// Check the account authority at `level`, falling back to stronger levels.
    pub fn check_account(
        &mut self,
        account: &AccountName,
        level: AuthorityLevel,
    ) -> Result<bool, AuthorityError> {
        let levels: &[AuthorityLevel] = match level {
            AuthorityLevel::Posting => &[
                AuthorityLevel::Posting,
                AuthorityLevel::Active,
                AuthorityLevel::Owner,
            ],
            AuthorityLevel::Active => &[AuthorityLevel::Active, AuthorityLevel::Owner],
            AuthorityLevel::Owner => &[AuthorityLevel::Owner],
        };

        for candidate in levels {
            if self.approved.contains(&(account.clone(), *candidate)) {
                return Ok(true);
            }

            let authority = self
                .provider
                .get_authority(account, *candidate)
                .ok_or_else(|| AuthorityError::UnknownAccount(account.clone()))?;
            if self.check_authority(&authority, *candidate, 0)? {
                trace!("{} approved at {} level", account, candidate);
                self.approved.insert((account.clone(), *candidate));
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// First provided key that did not contribute to any authority.
    pub fn first_unused_key(&self) -> Option<&PublicKey> {
        self.provided
            .iter()
            .find(|(_, used)| !**used)
            .map(|(key, _)| key)
    }
}

/// Verify that `keys` satisfy every required authority and nothing more.
pub fn verify_authority<P: AuthorityProvider + ?Sized>(
    provider: &P,
    required: &RequiredAuthorities,
    keys: &[PublicKey],
    max_recursion: u32,
) -> Result<(), AuthorityError> {
    let mut state = SignState::new(provider, keys, max_recursion)?;

    if !required.posting.is_empty()
        && (!required.active.is_empty() || !required.owner.is_empty() || !required.other.is_empty())
    {
        return Err(AuthorityError::MixedAuthorityLevels);
    }

    for authority in &required.other {
        if !state.check_authority(authority, AuthorityLevel::Active, 0)? {
            return Err(AuthorityError::MissingOtherAuthority);
        }
    }

    for account in &required.posting {
        if !state.check_account(account, AuthorityLevel::Posting)? {
            return Err(AuthorityError::MissingPostingAuthority(account.clone()));
        }
    }

    for account in &required.active {
        if !state.check_account(account, AuthorityLevel::Active)? {
            return Err(AuthorityError::MissingActiveAuthority(account.clone()));
        }
    }

    for account in &required.owner {
        if !state.check_account(account, AuthorityLevel::Owner)? {
            return Err(AuthorityError::MissingOwnerAuthority(account.clone()));
        }
    }

    if let Some(key) = state.first_unused_key() {
        return Err(AuthorityError::IrrelevantSignature(key.to_hex()));
    }

    Ok(())
}
