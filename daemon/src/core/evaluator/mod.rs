//! Operation evaluators.
//!
//! Each operation type applies itself to the database once its transaction
//! passed every stateless and authority check. Evaluators only read and
//! write through the database, inside the undo session of the transaction,
//! so a failure leaves nothing behind.

mod account;
mod asset;
mod comment;
mod escrow;
mod market;
mod producer;
mod transfer;

use super::{database::Database, error::BlockchainError};
use ezira_common::operation::Operation;

pub trait Evaluator {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError>;
}

pub fn apply_operation(db: &mut Database, op: &Operation) -> Result<(), BlockchainError> {
    match op {
        Operation::AccountCreate(op) => op.apply(db),
        Operation::AccountUpdate(op) => op.apply(db),
        Operation::AccountUpdateProxy(op) => op.apply(db),
        Operation::RequestAccountRecovery(op) => op.apply(db),
        Operation::RecoverAccount(op) => op.apply(db),
        Operation::ChangeRecoveryAccount(op) => op.apply(db),
        Operation::SetResetAccount(op) => op.apply(db),
        Operation::ResetAccount(op) => op.apply(db),
        Operation::Transfer(op) => op.apply(db),
        Operation::TransferToSavings(op) => op.apply(db),
        Operation::TransferFromSavings(op) => op.apply(db),
        Operation::StakeAsset(op) => op.apply(db),
        Operation::UnstakeAsset(op) => op.apply(db),
        Operation::UnstakeAssetRoute(op) => op.apply(db),
        Operation::ClaimRewardBalance(op) => op.apply(db),
        Operation::TransferRecurring(op) => op.apply(db),
        Operation::EscrowTransfer(op) => op.apply(db),
        Operation::EscrowApprove(op) => op.apply(db),
        Operation::EscrowDispute(op) => op.apply(db),
        Operation::EscrowRelease(op) => op.apply(db),
        Operation::UpdateMediator(op) => op.apply(db),
        Operation::Comment(op) => op.apply(db),
        Operation::CommentOptions(op) => op.apply(db),
        Operation::Vote(op) => op.apply(db),
        Operation::LimitOrderCreate(op) => op.apply(db),
        Operation::LimitOrderCancel(op) => op.apply(db),
        Operation::AssetCreate(op) => op.apply(db),
        Operation::AssetIssue(op) => op.apply(db),
        Operation::ProducerUpdate(op) => op.apply(db),
        Operation::View(op) => op.apply(db),
        Operation::Share(op) => op.apply(db),
        Operation::AccountMembership(op) => op.apply(db),
    }
}
