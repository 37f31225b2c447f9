use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::{EscrowObject, MediatorObject},
    store::{IndexKey, ObjectId},
};
use ezira_common::{
    account::AccountName,
    asset::Asset,
    config::{ESCROW_DISPUTE_DURATION, ESCROW_DISPUTE_MEDIATOR_AMOUNT},
    crypto::{hash_parts, Hash},
    time::TimestampSeconds,
};
use itertools::Itertools;
use log::{debug, info};
use std::collections::BTreeSet;

/// Share of the payment released to the receiver once a dispute closes.
///
/// The median of the submitted votes, the two middle votes are averaged
/// and rounded down for an even count. `None` without votes.
pub fn dispute_median(votes: impl IntoIterator<Item = u16>) -> Option<u16> {
    let votes: Vec<u16> = votes.into_iter().sorted_unstable().collect();
    if votes.is_empty() {
        return None;
    }
    let middle = votes.len() / 2;
    if votes.len() % 2 == 1 {
        Some(votes[middle])
    } else {
        Some(((votes[middle - 1] as u32 + votes[middle] as u32) / 2) as u16)
    }
}

impl Database {
    /// Close an escrow: `release_percent` of the payment goes to the receiver,
    /// the rest back to the sender.
    ///
    /// Bonds are returned to their depositors except for the accounts in
    /// `forfeited`, whose bonds are split like the payment.
    pub(crate) fn settle_escrow(
        &mut self,
        id: ObjectId,
        release_percent: u16,
        forfeited: &BTreeSet<AccountName>,
    ) -> Result<(), BlockchainError> {
        let escrow = self.store.remove::<EscrowObject>(id)?;
        let bond = escrow.bond();

        let mut pool = if escrow.from_approved {
            escrow.payment.clone()
        } else {
            Asset::zero(escrow.payment.symbol.clone())
        };
        let mut paid: i64 = 0;
        for approver in escrow.approvers() {
            if forfeited.contains(&approver) {
                pool = pool.checked_add(&bond).ok_or(BlockchainError::Overflow)?;
            } else {
                self.adjust_liquid_balance(&approver, &bond)?;
                paid += bond.amount;
            }
        }

        let to_share = pool.percent(release_percent);
        let from_share = pool.checked_sub(&to_share).ok_or(BlockchainError::Overflow)?;
        self.adjust_liquid_balance(&escrow.to, &to_share)?;
        self.adjust_liquid_balance(&escrow.from, &from_share)?;
        paid += pool.amount;

        if paid != escrow.balance.amount {
            return Err(BlockchainError::InvariantViolation(format!(
                "escrow {} of {} paid {} out of {}",
                escrow.escrow_id, escrow.from, paid, escrow.balance
            )));
        }

        let now = self.head_block_time()?;
        let mut mediators: BTreeSet<&AccountName> = escrow.mediators.iter().collect();
        mediators.insert(&escrow.from_mediator);
        mediators.insert(&escrow.to_mediator);
        for mediator in mediators {
            if let Some(object) = self.find_mediator(mediator) {
                let mediator_id = object.id;
                self.store.modify::<MediatorObject, _>(mediator_id, |object| {
                    object.last_escrow_from = escrow.from.clone();
                    object.last_escrow_id = escrow.escrow_id.clone();
                    object.last_updated = now;
                })?;
            }
        }

        info!(
            "escrow {} of {} closed: {} to {}, {} to {}",
            escrow.escrow_id, escrow.from, to_share, escrow.to, from_share, escrow.from
        );
        Ok(())
    }

    /// Give every deposit back to its depositor.
    pub(crate) fn refund_escrow(&mut self, id: ObjectId) -> Result<(), BlockchainError> {
        self.settle_escrow(id, 0, &BTreeSet::new())
    }

    /// Mediators reviewing a dispute, ordered by a hash of the head block id
    /// and their name so no party can pick them.
    pub(crate) fn select_dispute_panel(
        &self,
        escrow: &EscrowObject,
    ) -> Result<BTreeSet<AccountName>, BlockchainError> {
        let seed = self.head_block_id()?;
        let excluded = [&escrow.from, &escrow.to, &escrow.from_mediator, &escrow.to_mediator];

        let mut candidates: Vec<(Hash, &AccountName)> = self
            .store
            .iter::<MediatorObject>()
            .filter(|mediator| mediator.active && !excluded.contains(&&mediator.account))
            .map(|mediator| {
                let rank = hash_parts(&[&seed.as_bytes()[..], mediator.account.as_str().as_bytes()]);
                (rank, &mediator.account)
            })
            .collect();
        candidates.sort();

        Ok(candidates
            .into_iter()
            .take(ESCROW_DISPUTE_MEDIATOR_AMOUNT)
            .map(|(_, account)| account.clone())
            .collect())
    }

    /// Refund escrows that were not approved or released in time, and settle
    /// the disputes whose review window closed with votes.
    pub(super) fn process_escrows(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let unapproved_prefix = IndexKey::new().with_bool(false);
        let unapproved: Vec<ObjectId> = self
            .store
            .iter_index::<EscrowObject>(EscrowObject::BY_ACCEPTANCE_TIME, &unapproved_prefix)
            .take_while(|escrow| escrow.acceptance_time <= now)
            .map(|escrow| escrow.id)
            .collect();
        for id in unapproved {
            debug!("escrow #{} was not approved in time", id);
            self.refund_escrow(id)?;
        }

        let expired: Vec<ObjectId> = self
            .store
            .iter::<EscrowObject>()
            .filter(|escrow| escrow.is_approved() && !escrow.disputed && escrow.escrow_expiration <= now)
            .map(|escrow| escrow.id)
            .collect();
        for id in expired {
            debug!("escrow #{} expired without release", id);
            self.refund_escrow(id)?;
        }

        let disputed_prefix = IndexKey::new().with_bool(true);
        let closed: Vec<ObjectId> = self
            .store
            .iter_index::<EscrowObject>(EscrowObject::BY_DISPUTE_RELEASE_TIME, &disputed_prefix)
            .take_while(|escrow| escrow.dispute_release_time <= now)
            .map(|escrow| escrow.id)
            .collect();
        for id in closed {
            let escrow = self.store.get::<EscrowObject>(id)?;
            match dispute_median(escrow.release_percentages.values().copied()) {
                Some(percent) => {
                    let forfeited: BTreeSet<AccountName> = escrow
                        .approvers()
                        .into_iter()
                        .filter(|account| !escrow.release_percentages.contains_key(account))
                        .collect();
                    self.settle_escrow(id, percent, &forfeited)?;
                }
                None => {
                    // Nothing is assumed without votes, the review window reopens
                    let release_time = now.saturating_add(ESCROW_DISPUTE_DURATION);
                    debug!("disputed escrow #{} has no votes, review extended until {}", id, release_time);
                    self.store.modify::<EscrowObject, _>(id, |escrow| {
                        escrow.dispute_release_time = release_time;
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispute_median() {
        assert_eq!(dispute_median([]), None);
        assert_eq!(dispute_median([7_500]), Some(7_500));
        assert_eq!(dispute_median([10_000, 0, 5_000]), Some(5_000));
        assert_eq!(dispute_median([0, 10_000]), Some(5_000));
        assert_eq!(dispute_median([1, 2, 9_000, 10_000]), Some(4_501));
    }
}
