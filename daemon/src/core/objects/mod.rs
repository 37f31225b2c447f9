//! Rows of the chain state.

mod account;
mod balance;
mod chain;
mod comment;
mod escrow;
mod market;
mod transfer;

pub use account::*;
pub use balance::*;
pub use chain::*;
pub use comment::*;
pub use escrow::*;
pub use market::*;
pub use transfer::*;

use super::store::Store;

/// Register every chain object table in a fresh store.
pub fn register_objects(store: &mut Store) {
    store.register::<DynamicGlobalPropertyObject>();
    store.register::<AccountObject>();
    store.register::<AccountAuthorityObject>();
    store.register::<OwnerAuthorityHistoryObject>();
    store.register::<AccountRecoveryRequestObject>();
    store.register::<ChangeRecoveryAccountRequestObject>();
    store.register::<AssetObject>();
    store.register::<AccountBalanceObject>();
    store.register::<SavingsWithdrawObject>();
    store.register::<UnstakeRouteObject>();
    store.register::<RecurringTransferObject>();
    store.register::<EscrowObject>();
    store.register::<MediatorObject>();
    store.register::<CommentObject>();
    store.register::<CommentVoteObject>();
    store.register::<CommentViewObject>();
    store.register::<CommentShareObject>();
    store.register::<RewardFundObject>();
    store.register::<LimitOrderObject>();
    store.register::<ProducerObject>();
    store.register::<BlockSummaryObject>();
    store.register::<TransactionObject>();
}
