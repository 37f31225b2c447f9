mod sign_state;

pub use sign_state::{verify_authority, AuthorityProvider, SignState};

use crate::{
    account::AccountName,
    config::MAX_AUTHORITY_MEMBERSHIP,
    crypto::PublicKey,
    error::ValidationError,
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::Display;

/// Authority level an operation requires, from strongest to weakest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorityLevel {
    Owner,
    Active,
    Posting,
}

/// Weighted multisig: satisfied once the weights of the approving keys and
/// accounts reach `weight_threshold`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    pub fn new(weight_threshold: u32) -> Self {
        Self {
            weight_threshold,
            ..Default::default()
        }
    }

    /// Single key authority with threshold 1.
    pub fn from_key(key: PublicKey) -> Self {
        let mut authority = Self::new(1);
        authority.add_key(key, 1);
        authority
    }

    pub fn add_key(&mut self, key: PublicKey, weight: u16) -> &mut Self {
        self.key_auths.insert(key, weight);
        self
    }

    pub fn add_account(&mut self, account: AccountName, weight: u16) -> &mut Self {
        self.account_auths.insert(account, weight);
        self
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    // The sum of every weight cannot reach the threshold
    pub fn is_impossible(&self) -> bool {
        let total: u64 = self
            .account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| *w as u64)
            .sum();
        total < self.weight_threshold as u64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.num_auths() > MAX_AUTHORITY_MEMBERSHIP {
            return Err(ValidationError::AuthorityTooLarge(self.num_auths()));
        }

        for account in self.account_auths.keys() {
            if !account.is_valid() {
                return Err(ValidationError::InvalidAccountName(account.to_string()));
            }
        }

        if self.weight_threshold == 0 || self.is_impossible() {
            return Err(ValidationError::ImpossibleAuthority);
        }

        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.key_auths.keys()
    }
}

impl Serializer for Authority {
    fn write(&self, writer: &mut Writer) {
        writer.write_u32(self.weight_threshold);
        self.account_auths.write(writer);
        self.key_auths.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            weight_threshold: reader.read_u32()?,
            account_auths: BTreeMap::read(reader)?,
            key_auths: BTreeMap::read(reader)?,
        })
    }
}

/// Authorities a set of operations needs before it can be applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredAuthorities {
    pub owner: BTreeSet<AccountName>,
    pub active: BTreeSet<AccountName>,
    pub posting: BTreeSet<AccountName>,
    // Authorities not attached to an account, e.g. the ones proven by a recovery
    pub other: Vec<Authority>,
}

impl RequiredAuthorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, account: &AccountName, level: AuthorityLevel) -> &mut Self {
        let set = match level {
            AuthorityLevel::Owner => &mut self.owner,
            AuthorityLevel::Active => &mut self.active,
            AuthorityLevel::Posting => &mut self.posting,
        };
        set.insert(account.clone());
        self
    }

    pub fn merge(&mut self, other: RequiredAuthorities) {
        self.owner.extend(other.owner);
        self.active.extend(other.active);
        self.posting.extend(other.posting);
        self.other.extend(other.other);
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
            && self.active.is_empty()
            && self.posting.is_empty()
            && self.other.is_empty()
    }

    /// Every account named at any level.
    pub fn accounts(&self) -> BTreeSet<AccountName> {
        self.owner
            .iter()
            .chain(self.active.iter())
            .chain(self.posting.iter())
            .cloned()
            .collect()
    }
}
