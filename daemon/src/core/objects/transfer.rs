use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    asset::Asset,
    time::{DurationSeconds, TimestampSeconds},
};
use serde::{Deserialize, Serialize};

/// Pending withdrawal out of a savings balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavingsWithdrawObject {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub request_id: String,
    pub memo: String,
    pub complete: TimestampSeconds,
}

impl_object!(SavingsWithdrawObject, Table::SavingsWithdrawals, {
    BY_FROM_REQUEST: unique => |o| SavingsWithdrawObject::request_key(&o.from, &o.request_id),
    BY_COMPLETE: non_unique => |o| IndexKey::new().with_time(o.complete),
});

impl SavingsWithdrawObject {
    pub fn request_key(from: &AccountName, request_id: &str) -> IndexKey {
        IndexKey::new().with_str(from.as_str()).with_str(request_id)
    }

    pub fn from_key(from: &AccountName) -> IndexKey {
        IndexKey::new().with_str(from.as_str())
    }
}

/// Destination of a share of every unstake payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnstakeRouteObject {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub percent: u16,
    // Credit the routed share to the staked balance of the receiver
    pub auto_stake: bool,
}

impl_object!(UnstakeRouteObject, Table::UnstakeRoutes, {
    BY_ROUTE: unique => |o| UnstakeRouteObject::route_key(&o.from, &o.to),
});

impl UnstakeRouteObject {
    pub fn route_key(from: &AccountName, to: &AccountName) -> IndexKey {
        IndexKey::new().with_str(from.as_str()).with_str(to.as_str())
    }

    pub fn from_key(from: &AccountName) -> IndexKey {
        IndexKey::new().with_str(from.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransferObject {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub transfer_id: String,
    pub memo: String,
    pub begin: TimestampSeconds,
    pub end: TimestampSeconds,
    pub interval: DurationSeconds,
    pub next_transfer: TimestampSeconds,
    pub payments_remaining: u32,
    // Failed payments push the schedule back instead of being skipped
    pub extensible: bool,
    // The first failed payment cancels the transfer
    pub fill_or_kill: bool,
}

impl_object!(RecurringTransferObject, Table::RecurringTransfers, {
    BY_TRANSFER_ID: unique => |o| RecurringTransferObject::transfer_key(&o.from, &o.transfer_id),
    BY_NEXT_TRANSFER: non_unique => |o| IndexKey::new().with_time(o.next_transfer),
});

impl RecurringTransferObject {
    pub fn transfer_key(from: &AccountName, transfer_id: &str) -> IndexKey {
        IndexKey::new().with_str(from.as_str()).with_str(transfer_id)
    }
}
