use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::{AccountName, MembershipTier},
    authority::Authority,
    config::{MAX_PROXY_RECURSION_DEPTH, PERCENT_100},
    crypto::PublicKey,
    time::{TimestampSeconds, TIME_MAX},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountObject {
    pub id: ObjectId,
    pub name: AccountName,
    pub memo_key: PublicKey,
    pub json_metadata: String,
    // Empty when voting with its own stake
    pub proxy: AccountName,
    // Staked COIN received through proxies, by distance in the proxy chain
    pub proxied_stake: [i64; MAX_PROXY_RECURSION_DEPTH],
    pub recovery_account: AccountName,
    pub reset_account: AccountName,
    pub reset_account_delay_days: u16,
    pub last_account_recovery: TimestampSeconds,
    pub created: TimestampSeconds,
    pub last_account_update: TimestampSeconds,
    // Last time the account signed a transaction
    pub last_activity: TimestampSeconds,
    // Basis points of a full voting mana
    pub voting_mana: u16,
    pub last_vote_time: TimestampSeconds,
    pub viewing_mana: u16,
    pub last_view_time: TimestampSeconds,
    pub sharing_mana: u16,
    pub last_share_time: TimestampSeconds,
    pub post_count: u32,
    pub last_post: TimestampSeconds,
    pub membership: MembershipTier,
    // TIME_MAX without a paid membership
    pub membership_expiration: TimestampSeconds,
    pub recurring_membership: bool,
}

impl_object!(AccountObject, Table::Accounts, {
    BY_NAME: unique => |o| AccountObject::name_key(&o.name),
    BY_PROXY: non_unique => |o| IndexKey::new().with_str(o.proxy.as_str()).with_str(o.name.as_str()),
    BY_MEMBERSHIP_EXPIRATION: non_unique => |o| IndexKey::new().with_time(o.membership_expiration),
});

impl AccountObject {
    pub fn new(name: AccountName, memo_key: PublicKey, time: TimestampSeconds) -> Self {
        Self {
            id: 0,
            name,
            memo_key,
            json_metadata: String::new(),
            proxy: AccountName::proxy_to_self(),
            proxied_stake: [0; MAX_PROXY_RECURSION_DEPTH],
            recovery_account: AccountName::default(),
            reset_account: AccountName::default(),
            reset_account_delay_days: 0,
            last_account_recovery: 0,
            created: time,
            last_account_update: time,
            last_activity: time,
            voting_mana: PERCENT_100,
            last_vote_time: time,
            viewing_mana: PERCENT_100,
            last_view_time: time,
            sharing_mana: PERCENT_100,
            last_share_time: time,
            post_count: 0,
            last_post: 0,
            membership: MembershipTier::None,
            membership_expiration: TIME_MAX,
            recurring_membership: false,
        }
    }

    pub fn name_key(name: &AccountName) -> IndexKey {
        IndexKey::new().with_str(name.as_str())
    }

    pub fn proxy_key(proxy: &AccountName) -> IndexKey {
        IndexKey::new().with_str(proxy.as_str())
    }

    /// Stake delegated to this account by every proxy level.
    pub fn proxied_total(&self) -> i64 {
        self.proxied_stake.iter().sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountAuthorityObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub last_owner_update: TimestampSeconds,
}

impl_object!(AccountAuthorityObject, Table::AccountAuthorities, {
    BY_ACCOUNT: unique => |o| AccountObject::name_key(&o.account),
});

/// Owner authority replaced by an update, still usable to prove a recovery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnerAuthorityHistoryObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub last_valid_time: TimestampSeconds,
}

impl_object!(OwnerAuthorityHistoryObject, Table::OwnerAuthorityHistory, {
    BY_ACCOUNT: non_unique => |o| AccountObject::name_key(&o.account),
    BY_LAST_VALID: non_unique => |o| IndexKey::new().with_time(o.last_valid_time),
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountRecoveryRequestObject {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires: TimestampSeconds,
}

impl_object!(AccountRecoveryRequestObject, Table::AccountRecoveryRequests, {
    BY_ACCOUNT: unique => |o| AccountObject::name_key(&o.account_to_recover),
    BY_EXPIRATION: non_unique => |o| IndexKey::new().with_time(o.expires),
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountRequestObject {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub recovery_account: AccountName,
    pub effective_on: TimestampSeconds,
}

impl_object!(ChangeRecoveryAccountRequestObject, Table::ChangeRecoveryAccountRequests, {
    BY_ACCOUNT: unique => |o| AccountObject::name_key(&o.account_to_recover),
    BY_EFFECTIVE_DATE: non_unique => |o| IndexKey::new().with_time(o.effective_on),
});
