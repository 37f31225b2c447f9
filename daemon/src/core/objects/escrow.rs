use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    asset::Asset,
    config::ESCROW_BOND_PERCENT,
    time::{TimestampSeconds, TIME_MAX},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Payment held by the chain until its parties agree on a release.
///
/// Once the sender approved, `balance` equals the payment plus the bond of
/// every account that approved so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowObject {
    pub id: ObjectId,
    pub escrow_id: String,
    pub from: AccountName,
    pub to: AccountName,
    pub from_mediator: AccountName,
    pub to_mediator: AccountName,
    pub payment: Asset,
    pub balance: Asset,
    pub acceptance_time: TimestampSeconds,
    pub escrow_expiration: TimestampSeconds,
    pub dispute_release_time: TimestampSeconds,
    // Panel allocated when the escrow is disputed
    pub mediators: BTreeSet<AccountName>,
    // Panel members that deposited their bond
    pub panel_approvals: BTreeSet<AccountName>,
    // Votes on the share of the payment going to `to`, once disputed
    pub release_percentages: BTreeMap<AccountName, u16>,
    pub from_approved: bool,
    pub to_approved: bool,
    pub from_mediator_approved: bool,
    pub to_mediator_approved: bool,
    pub disputed: bool,
    pub memo: String,
    pub json: String,
    pub created: TimestampSeconds,
    pub last_updated: TimestampSeconds,
}

impl_object!(EscrowObject, Table::Escrows, {
    BY_FROM_ID: unique => |o| EscrowObject::escrow_key(&o.from, &o.escrow_id),
    BY_ACCEPTANCE_TIME: non_unique => |o| IndexKey::new().with_bool(o.is_approved()).with_time(o.acceptance_time),
    BY_DISPUTE_RELEASE_TIME: non_unique => |o| IndexKey::new().with_bool(o.disputed).with_time(o.dispute_release_time),
});

impl EscrowObject {
    pub fn new(
        escrow_id: String,
        from: AccountName,
        to: AccountName,
        payment: Asset,
        acceptance_time: TimestampSeconds,
        escrow_expiration: TimestampSeconds,
        time: TimestampSeconds,
    ) -> Self {
        Self {
            id: 0,
            escrow_id,
            from,
            to,
            from_mediator: AccountName::default(),
            to_mediator: AccountName::default(),
            balance: Asset::zero(payment.symbol.clone()),
            payment,
            acceptance_time,
            escrow_expiration,
            dispute_release_time: TIME_MAX,
            mediators: BTreeSet::new(),
            panel_approvals: BTreeSet::new(),
            release_percentages: BTreeMap::new(),
            from_approved: false,
            to_approved: false,
            from_mediator_approved: false,
            to_mediator_approved: false,
            disputed: false,
            memo: String::new(),
            json: String::new(),
            created: time,
            last_updated: time,
        }
    }

    pub fn escrow_key(from: &AccountName, escrow_id: &str) -> IndexKey {
        IndexKey::new().with_str(from.as_str()).with_str(escrow_id)
    }

    /// Deposit every approver adds to the balance.
    pub fn bond(&self) -> Asset {
        self.payment.percent(ESCROW_BOND_PERCENT)
    }

    pub fn is_approved(&self) -> bool {
        self.from_approved
            && self.to_approved
            && self.from_mediator_approved
            && self.to_mediator_approved
    }

    pub fn is_party(&self, account: &AccountName) -> bool {
        *account == self.from || *account == self.to
    }

    pub fn is_panel_mediator(&self, account: &AccountName) -> bool {
        self.mediators.contains(account)
    }

    /// Whether `account` deposited into the escrow in any role.
    pub fn has_approved(&self, account: &AccountName) -> bool {
        (self.from_approved && *account == self.from)
            || (self.to_approved && *account == self.to)
            || (self.from_mediator_approved && *account == self.from_mediator)
            || (self.to_mediator_approved && *account == self.to_mediator)
            || self.panel_approvals.contains(account)
    }

    /// Accounts that deposited into the balance, the sender first.
    pub fn approvers(&self) -> Vec<AccountName> {
        let mut approvers = Vec::with_capacity(4 + self.panel_approvals.len());
        if self.from_approved {
            approvers.push(self.from.clone());
        }
        if self.to_approved {
            approvers.push(self.to.clone());
        }
        if self.from_mediator_approved {
            approvers.push(self.from_mediator.clone());
        }
        if self.to_mediator_approved {
            approvers.push(self.to_mediator.clone());
        }
        approvers.extend(self.panel_approvals.iter().cloned());
        approvers
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediatorObject {
    pub id: ObjectId,
    pub account: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    // Staked COIN the mediator commits to keep
    pub mediator_bond: Asset,
    pub active: bool,
    pub created: TimestampSeconds,
    pub last_updated: TimestampSeconds,
    pub last_escrow_from: AccountName,
    pub last_escrow_id: String,
}

impl_object!(MediatorObject, Table::Mediators, {
    BY_ACCOUNT: unique => |o| IndexKey::new().with_str(o.account.as_str()),
});

impl MediatorObject {
    pub fn account_key(account: &AccountName) -> IndexKey {
        IndexKey::new().with_str(account.as_str())
    }
}
