use super::Database;
use crate::{
    config::SkipFlags,
    core::{
        error::BlockchainError,
        evaluator::apply_operation,
        objects::{BlockSummaryObject, TransactionObject},
        store::{IndexKey, ObjectId, UndoSession},
    },
};
use ezira_common::{
    authority::verify_authority,
    config::{MAX_SIG_CHECK_DEPTH, MAX_TIME_UNTIL_EXPIRATION},
    crypto::Hash,
    time::TimestampSeconds,
    transaction::{reference_of, SignedTransaction},
};
use indexmap::IndexMap;
use log::{debug, log_enabled, trace, Level};

// Pending transactions by id, with the checks skipped when they were pushed
pub(super) type PendingTransactions = IndexMap<Hash, (SignedTransaction, SkipFlags)>;

impl Database {
    /// Validate a transaction and apply it on top of the pending state.
    ///
    /// On failure the state is left exactly as it was before the call.
    pub fn push_transaction(
        &mut self,
        tx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockchainError> {
        self.check_not_halted()?;
        let result = self.push_pending_transaction(tx, skip);
        self.check_fatal(result)
    }

    pub(super) fn push_pending_transaction(
        &mut self,
        tx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockchainError> {
        if !self.pending_session {
            self.store.start_undo_session();
            self.pending_session = true;
        }

        self.apply_transaction_in_session(tx, skip)?;
        let id = tx.id();
        if log_enabled!(Level::Debug) {
            debug!("transaction {} added to the pending state", id);
        }
        self.pending_transactions.insert(id, (tx.clone(), skip));
        Ok(())
    }

    // Nested session so a failing transaction leaves no trace
    pub(super) fn apply_transaction_in_session(
        &mut self,
        tx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockchainError> {
        let mut session = UndoSession::new(self);
        session.apply_transaction(tx, skip)?;
        session.squash()?;
        Ok(())
    }

    /// Every check and every operation of a transaction, in order.
    ///
    /// Must run inside an undo session, partial effects of a failure are not
    /// reverted here.
    pub(super) fn apply_transaction(
        &mut self,
        tx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockchainError> {
        let trx = &tx.transaction;
        trx.validate()?;
        tx.check_size()?;

        let now = self.head_block_time()?;
        if trx.expiration <= now {
            return Err(BlockchainError::TransactionExpired {
                expiration: trx.expiration,
                now,
            });
        }
        if trx.expiration > now.saturating_add(MAX_TIME_UNTIL_EXPIRATION) {
            return Err(BlockchainError::ExpirationTooFar {
                expiration: trx.expiration,
                now,
            });
        }

        if !skip.contains(SkipFlags::TAPOS_CHECK) && trx.has_reference_block() {
            let summary = self.store.find_by::<BlockSummaryObject>(
                BlockSummaryObject::BY_SLOT,
                &BlockSummaryObject::slot_key(trx.ref_block_num),
            );
            let matches = summary
                .map(|summary| reference_of(&summary.block_id).1 == trx.ref_block_prefix)
                .unwrap_or(false);
            if !matches {
                return Err(BlockchainError::InvalidReferenceBlock);
            }
        }

        let id = tx.id();
        if !skip.contains(SkipFlags::TRANSACTION_DUPE_CHECK) {
            if self.is_known_transaction(&id) {
                return Err(BlockchainError::DuplicateTransaction(id));
            }
            self.store.create(TransactionObject {
                id: 0,
                trx_id: id,
                expiration: trx.expiration,
            })?;
        }

        let required = trx.required_authorities();
        if !skip.contains(SkipFlags::AUTHORITY_CHECK) || !skip.contains(SkipFlags::TRANSACTION_SIGNATURES) {
            let keys = if skip.contains(SkipFlags::TRANSACTION_SIGNATURES) {
                tx.signer_keys()
            } else {
                tx.verify_signatures(&self.chain_id)?
            };
            if !skip.contains(SkipFlags::AUTHORITY_CHECK) {
                verify_authority(self, &required, &keys, MAX_SIG_CHECK_DEPTH)?;
            }
        }

        for (index, op) in trx.operations.iter().enumerate() {
            if log_enabled!(Level::Trace) {
                trace!("applying operation {} ({}) of {}", index, op.name(), id);
            }
            apply_operation(self, op).map_err(|e| BlockchainError::Operation {
                index,
                name: op.name(),
                source: Box::new(e),
            })?;
        }

        self.touch_accounts(&required.accounts())?;
        Ok(())
    }

    pub fn is_known_transaction(&self, id: &Hash) -> bool {
        self.store
            .find_by::<TransactionObject>(TransactionObject::BY_TRX_ID, &TransactionObject::trx_key(id))
            .is_some()
    }

    // Transaction ids can be forgotten once they can no longer be applied
    pub(super) fn clear_expired_transactions(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let expired: Vec<ObjectId> = self
            .store
            .iter_index::<TransactionObject>(TransactionObject::BY_EXPIRATION, &IndexKey::new())
            .take_while(|tx| tx.expiration <= now)
            .map(|tx| tx.id)
            .collect();
        for id in expired {
            self.store.remove::<TransactionObject>(id)?;
        }
        Ok(())
    }

    /// Undo the pending state and hand back its transactions.
    pub(super) fn clear_pending(&mut self) -> Result<PendingTransactions, BlockchainError> {
        if self.pending_session {
            self.store.undo()?;
            self.pending_session = false;
        }
        Ok(std::mem::take(&mut self.pending_transactions))
    }

    /// Apply transactions again on top of the new head, dropping the ones that fail.
    ///
    /// The dupe check always runs so transactions included in a block are dropped.
    pub(super) fn restore_pending(
        &mut self,
        transactions: impl IntoIterator<Item = (SignedTransaction, SkipFlags)>,
    ) -> Result<(), BlockchainError> {
        for (tx, skip) in transactions {
            let skip = skip.without(SkipFlags::TRANSACTION_DUPE_CHECK);
            if let Err(e) = self.push_pending_transaction(&tx, skip) {
                if e.is_fatal() {
                    return Err(e);
                }
                if log_enabled!(Level::Debug) {
                    debug!("dropping pending transaction {}: {}", tx.id(), e);
                }
            }
        }
        Ok(())
    }

    /// Run `f` on the head state, without the pending transactions.
    pub(super) fn without_pending_transactions<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, BlockchainError>,
    ) -> Result<R, BlockchainError> {
        let pending = self.clear_pending()?;
        let result = f(self);
        if matches!(&result, Err(e) if e.is_fatal()) {
            return result;
        }
        self.restore_pending(pending.into_values())?;
        result
    }
}
