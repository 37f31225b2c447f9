use super::Evaluator;
use crate::core::{
    database::{Database, OrderRequest},
    error::BlockchainError,
};
use ezira_common::operation::{LimitOrderCancelOperation, LimitOrderCreateOperation};
use log::{log_enabled, trace, Level};

impl Evaluator for LimitOrderCreateOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        if self.expiration <= now {
            return Err(BlockchainError::MarketRule("order expiration is in the past"));
        }
        db.get_account(&self.owner)?;
        db.get_asset(&self.amount_to_sell.symbol)?;
        db.get_asset(&self.min_to_receive.symbol)?;

        if log_enabled!(Level::Trace) {
            trace!(
                "{} sells {} for at least {}",
                self.owner, self.amount_to_sell, self.min_to_receive
            );
        }
        db.place_limit_order(OrderRequest {
            seller: self.owner.clone(),
            order_id: self.order_id,
            amount_to_sell: self.amount_to_sell.clone(),
            sell_price: self.price(),
            expiration: self.expiration,
            fill_or_kill: self.fill_or_kill,
        })
    }
}

impl Evaluator for LimitOrderCancelOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        db.cancel_limit_order(&self.owner, self.order_id)
    }
}
