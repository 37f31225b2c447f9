use super::Evaluator;
use crate::core::{
    database::Database,
    error::BlockchainError,
    objects::{BalanceKind, EscrowObject, MediatorObject},
    store::ObjectId,
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    config::{ESCROW_DISPUTE_DURATION, PERCENT_100},
    operation::{
        EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
        EscrowTransferOperation, UpdateMediatorOperation,
    },
    time::TimestampSeconds,
};
use log::{debug, info};
use std::collections::BTreeSet;

// Move funds from a liquid balance into the escrow
fn deposit(
    db: &mut Database,
    id: ObjectId,
    account: &AccountName,
    amount: &Asset,
    now: TimestampSeconds,
) -> Result<(), BlockchainError> {
    db.adjust_liquid_balance(account, &amount.negated())?;
    let balance = db
        .store()
        .get::<EscrowObject>(id)?
        .balance
        .checked_add(amount)
        .ok_or(BlockchainError::Overflow)?;
    db.store_mut().modify::<EscrowObject, _>(id, |escrow| {
        escrow.balance = balance;
        escrow.last_updated = now;
    })?;
    Ok(())
}

// A nominated mediator must be an active mediator outside the escrow parties
fn check_mediator(db: &Database, escrow: &EscrowObject, mediator: &AccountName) -> Result<(), BlockchainError> {
    if escrow.is_party(mediator) {
        return Err(BlockchainError::EscrowRule("a party cannot mediate its own escrow"));
    }
    match db.find_mediator(mediator) {
        Some(object) if object.active => Ok(()),
        _ => Err(BlockchainError::UnknownMediator(mediator.clone())),
    }
}

impl Evaluator for EscrowTransferOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        if self.acceptance_time <= now {
            return Err(BlockchainError::EscrowRule("acceptance time must be in the future"));
        }
        db.get_account(&self.from)?;
        db.get_account(&self.to)?;
        db.get_asset(&self.amount.symbol)?;

        if let Some(existing) = db.find_escrow(&self.from, &self.escrow_id) {
            // Proposals can be edited until someone deposits
            if !existing.approvers().is_empty() || existing.to != self.to {
                return Err(BlockchainError::EscrowExists {
                    from: self.from.clone(),
                    escrow_id: self.escrow_id.clone(),
                });
            }
            let id = existing.id;
            db.store_mut().modify::<EscrowObject, _>(id, |escrow| {
                escrow.payment = self.amount.clone();
                escrow.balance = Asset::zero(self.amount.symbol.clone());
                escrow.acceptance_time = self.acceptance_time;
                escrow.escrow_expiration = self.escrow_expiration;
                escrow.memo = self.memo.clone();
                escrow.json = self.json.clone();
                escrow.last_updated = now;
            })?;
            debug!("escrow {} of {} edited by {}", self.escrow_id, self.from, self.account);
            return Ok(());
        }

        let mut escrow = EscrowObject::new(
            self.escrow_id.clone(),
            self.from.clone(),
            self.to.clone(),
            self.amount.clone(),
            self.acceptance_time,
            self.escrow_expiration,
            now,
        );
        escrow.memo = self.memo.clone();
        escrow.json = self.json.clone();
        db.store_mut().create(escrow)?;
        info!(
            "escrow {} proposed by {}: {} from {} to {}",
            self.escrow_id, self.account, self.amount, self.from, self.to
        );
        Ok(())
    }
}

impl Evaluator for EscrowApproveOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let escrow = db.get_escrow(&self.escrow_from, &self.escrow_id)?.clone();
        let bond = escrow.bond();

        if escrow.disputed {
            if !escrow.is_panel_mediator(&self.account) {
                return Err(BlockchainError::EscrowRule(
                    "only the dispute panel can approve a disputed escrow",
                ));
            }
            if !self.approved {
                return Err(BlockchainError::EscrowRule("a disputed escrow cannot be rejected"));
            }
            if escrow.panel_approvals.contains(&self.account) {
                return Err(BlockchainError::EscrowRule("escrow is already approved"));
            }
            deposit(db, escrow.id, &self.account, &bond, now)?;
            db.store_mut().modify::<EscrowObject, _>(escrow.id, |escrow| {
                escrow.panel_approvals.insert(self.account.clone());
            })?;
            debug!("{} joined the dispute panel of escrow {}", self.account, self.escrow_id);
            return Ok(());
        }

        if escrow.is_approved() {
            return Err(BlockchainError::EscrowRule("escrow is already approved"));
        }
        if now >= escrow.acceptance_time {
            return Err(BlockchainError::EscrowRule("acceptance time has passed"));
        }

        let participant = escrow.is_party(&self.account)
            || (!escrow.from_mediator.is_empty() && self.account == escrow.from_mediator)
            || (!escrow.to_mediator.is_empty() && self.account == escrow.to_mediator);
        if !participant {
            return Err(BlockchainError::EscrowRule("not a participant of this escrow"));
        }

        if !self.approved {
            info!("escrow {} of {} rejected by {}", self.escrow_id, self.escrow_from, self.account);
            return db.refund_escrow(escrow.id);
        }
        if escrow.has_approved(&self.account) {
            return Err(BlockchainError::EscrowRule("escrow is already approved"));
        }

        if self.account == escrow.from || self.account == escrow.to {
            let is_from = self.account == escrow.from;
            let current = if is_from { &escrow.from_mediator } else { &escrow.to_mediator };
            let mediator = if self.mediator.is_empty() { current.clone() } else { self.mediator.clone() };
            if mediator.is_empty() {
                return Err(BlockchainError::EscrowRule("a mediator must be nominated"));
            }
            check_mediator(db, &escrow, &mediator)?;

            let amount = if is_from {
                escrow.payment.checked_add(&bond).ok_or(BlockchainError::Overflow)?
            } else {
                bond
            };
            deposit(db, escrow.id, &self.account, &amount, now)?;
            db.store_mut().modify::<EscrowObject, _>(escrow.id, |escrow| {
                if is_from {
                    escrow.from_mediator = mediator;
                    escrow.from_approved = true;
                } else {
                    escrow.to_mediator = mediator;
                    escrow.to_approved = true;
                }
            })?;
        } else {
            check_mediator(db, &escrow, &self.account)?;
            deposit(db, escrow.id, &self.account, &bond, now)?;
            let is_from_mediator = self.account == escrow.from_mediator;
            db.store_mut().modify::<EscrowObject, _>(escrow.id, |escrow| {
                if is_from_mediator {
                    escrow.from_mediator_approved = true;
                } else {
                    escrow.to_mediator_approved = true;
                }
            })?;
        }

        debug!("escrow {} of {} approved by {}", self.escrow_id, self.escrow_from, self.account);
        Ok(())
    }
}

impl Evaluator for EscrowDisputeOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let escrow = db.get_escrow(&self.escrow_from, &self.escrow_id)?.clone();
        if !escrow.is_party(&self.account) {
            return Err(BlockchainError::EscrowRule("only a party can dispute an escrow"));
        }
        if !escrow.is_approved() {
            return Err(BlockchainError::EscrowRule("escrow is not approved"));
        }
        if escrow.disputed {
            return Err(BlockchainError::EscrowRule("escrow is already disputed"));
        }
        if now >= escrow.escrow_expiration {
            return Err(BlockchainError::EscrowRule("escrow has expired"));
        }

        let panel = db.select_dispute_panel(&escrow)?;
        let release_time = now.saturating_add(ESCROW_DISPUTE_DURATION);
        info!(
            "escrow {} of {} disputed by {}, {} panel mediators until {}",
            self.escrow_id,
            self.escrow_from,
            self.account,
            panel.len(),
            release_time
        );
        db.store_mut().modify::<EscrowObject, _>(escrow.id, |escrow| {
            escrow.disputed = true;
            escrow.mediators = panel;
            escrow.dispute_release_time = release_time;
            escrow.last_updated = now;
        })?;
        Ok(())
    }
}

impl Evaluator for EscrowReleaseOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        let escrow = db.get_escrow(&self.escrow_from, &self.escrow_id)?.clone();

        if escrow.disputed {
            if !escrow.has_approved(&self.account) {
                return Err(BlockchainError::EscrowRule("only approvers vote on a disputed escrow"));
            }
            if now >= escrow.dispute_release_time {
                return Err(BlockchainError::EscrowRule("dispute is already closed"));
            }
            db.store_mut().modify::<EscrowObject, _>(escrow.id, |escrow| {
                escrow
                    .release_percentages
                    .insert(self.account.clone(), self.release_percent);
                escrow.last_updated = now;
            })?;
            debug!(
                "{} votes to release {} of escrow {} to {}",
                self.account, self.release_percent, self.escrow_id, escrow.to
            );
            return Ok(());
        }

        if !escrow.is_party(&self.account) {
            return Err(BlockchainError::EscrowRule("only a party can release an escrow"));
        }
        if !escrow.is_approved() {
            return Err(BlockchainError::EscrowRule("escrow is not approved"));
        }
        if now >= escrow.escrow_expiration {
            return Err(BlockchainError::EscrowRule("escrow has expired"));
        }
        // Each party can only give the payment to the other one
        if self.account == escrow.from && self.release_percent != PERCENT_100 {
            return Err(BlockchainError::EscrowRule("the sender can only release everything"));
        }
        if self.account == escrow.to && self.release_percent != 0 {
            return Err(BlockchainError::EscrowRule("the receiver can only refund everything"));
        }

        db.settle_escrow(escrow.id, self.release_percent, &BTreeSet::new())
    }
}

impl Evaluator for UpdateMediatorOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.account)?;
        let staked = db.get_balance(&self.account, &Symbol::coin(), BalanceKind::Staked);
        if staked.amount < self.mediator_bond.amount {
            return Err(BlockchainError::InsufficientFunds {
                account: self.account.clone(),
                kind: BalanceKind::Staked,
                available: staked,
                needed: self.mediator_bond.clone(),
            });
        }

        match db.find_mediator(&self.account).map(|mediator| mediator.id) {
            Some(id) => {
                db.store_mut().modify::<MediatorObject, _>(id, |mediator| {
                    mediator.details = self.details.clone();
                    mediator.url = self.url.clone();
                    mediator.json = self.json.clone();
                    mediator.mediator_bond = self.mediator_bond.clone();
                    mediator.active = self.active;
                    mediator.last_updated = now;
                })?;
            }
            None => {
                db.store_mut().create(MediatorObject {
                    id: 0,
                    account: self.account.clone(),
                    details: self.details.clone(),
                    url: self.url.clone(),
                    json: self.json.clone(),
                    mediator_bond: self.mediator_bond.clone(),
                    active: self.active,
                    created: now,
                    last_updated: now,
                    last_escrow_from: AccountName::default(),
                    last_escrow_id: String::new(),
                })?;
            }
        }
        info!("mediator {} updated, active: {}", self.account, self.active);
        Ok(())
    }
}
