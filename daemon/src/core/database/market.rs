use super::Database;
use crate::core::{
    error::BlockchainError,
    objects::LimitOrderObject,
    store::{IndexKey, ObjectId},
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Price},
    time::TimestampSeconds,
};
use log::{debug, log_enabled, Level};
use std::cmp::Ordering;

/// Order of two prices selling the same asset: the price paying more of
/// the quote asset per unit of the base asset comes first.
pub fn compare_prices(a: &Price, b: &Price) -> Ordering {
    let left = a.quote.amount as i128 * b.base.amount as i128;
    let right = b.quote.amount as i128 * a.base.amount as i128;
    left.cmp(&right)
}

/// Whether a maker selling at `maker` satisfies a taker selling at `taker`.
///
/// Both prices are expressed as `base` sold for `quote` received, on
/// opposite sides of the market.
pub fn prices_cross(taker: &Price, maker: &Price) -> bool {
    // maker.base / maker.quote >= taker.quote / taker.base
    maker.base.amount as i128 * taker.base.amount as i128
        >= taker.quote.amount as i128 * maker.quote.amount as i128
}

/// A new order to sell on the market.
#[derive(Clone, Debug)]
pub struct OrderRequest {
    pub seller: AccountName,
    pub order_id: u32,
    pub amount_to_sell: Asset,
    pub sell_price: Price,
    pub expiration: TimestampSeconds,
    pub fill_or_kill: bool,
}

impl Database {
    fn find_order_id(&self, seller: &AccountName, order_id: u32) -> Option<ObjectId> {
        self.find_limit_order(seller, order_id).map(|order| order.id)
    }

    // Makers able to fill a taker, best price first then oldest first
    fn matching_orders(&self, taker: &Price) -> Vec<ObjectId> {
        let market = LimitOrderObject::market_key(&taker.quote.symbol, &taker.base.symbol);
        let mut makers: Vec<&LimitOrderObject> = self
            .store
            .iter_index::<LimitOrderObject>(LimitOrderObject::BY_MARKET, &market)
            .filter(|maker| prices_cross(taker, &maker.sell_price))
            .collect();
        makers.sort_by(|a, b| {
            compare_prices(&b.sell_price.inverted(), &a.sell_price.inverted()).then(a.id.cmp(&b.id))
        });
        makers.into_iter().map(|maker| maker.id).collect()
    }

    /// Reserve the funds of an order, fill it against the book at the makers'
    /// prices and keep the remainder open.
    ///
    /// A fill or kill order that cannot be filled entirely fails without
    /// touching the book.
    pub(crate) fn place_limit_order(&mut self, request: OrderRequest) -> Result<(), BlockchainError> {
        if self.find_order_id(&request.seller, request.order_id).is_some() {
            return Err(BlockchainError::OrderExists {
                owner: request.seller,
                order_id: request.order_id,
            });
        }
        self.adjust_liquid_balance(&request.seller, &request.amount_to_sell.negated())?;

        let mut remaining = request.amount_to_sell.clone();
        for maker_id in self.matching_orders(&request.sell_price) {
            if remaining.is_zero() {
                break;
            }
            remaining = self.fill_against(&request.seller, &remaining, maker_id)?;
        }

        if remaining.is_zero() {
            return Ok(());
        }
        if request.fill_or_kill {
            return Err(BlockchainError::MarketRule("fill or kill order not filled"));
        }

        let leftover_receives = request
            .sell_price
            .convert(&remaining)
            .map(|asset| asset.is_positive())
            .unwrap_or(false);
        if !leftover_receives {
            self.adjust_liquid_balance(&request.seller, &remaining)?;
            if log_enabled!(Level::Debug) {
                debug!("refunded {} of dust to {}", remaining, request.seller);
            }
            return Ok(());
        }

        let now = self.head_block_time()?;
        self.store.create(LimitOrderObject {
            id: 0,
            seller: request.seller.clone(),
            order_id: request.order_id,
            created: now,
            expiration: request.expiration,
            for_sale: remaining.amount,
            sell_price: request.sell_price,
        })?;
        if log_enabled!(Level::Debug) {
            debug!("order {} of {} rests with {} for sale", request.order_id, request.seller, remaining);
        }
        Ok(())
    }

    // Trade `offered` of a taker against one maker, returns what the taker has left
    fn fill_against(
        &mut self,
        taker: &AccountName,
        offered: &Asset,
        maker_id: ObjectId,
    ) -> Result<Asset, BlockchainError> {
        let maker = self.store.get::<LimitOrderObject>(maker_id)?.clone();
        let maker_wants = maker.amount_to_receive().ok_or(BlockchainError::Overflow)?;

        if !maker_wants.is_positive() {
            self.remove_order(maker_id)?;
            return Ok(offered.clone());
        }

        let (taker_pays, taker_gets) = if offered.amount >= maker_wants.amount {
            (maker_wants, maker.amount_for_sale())
        } else {
            let gets = maker.sell_price.convert(offered).ok_or(BlockchainError::Overflow)?;
            if !gets.is_positive() {
                return Ok(offered.clone());
            }
            (offered.clone(), gets)
        };

        self.adjust_liquid_balance(&maker.seller, &taker_pays)?;
        self.adjust_liquid_balance(taker, &taker_gets)?;
        if log_enabled!(Level::Debug) {
            debug!(
                "filled order {} of {}: {} for {} from {}",
                maker.order_id, maker.seller, taker_gets, taker_pays, taker
            );
        }

        let maker_left = maker.for_sale - taker_gets.amount;
        if maker_left == 0 {
            self.store.remove::<LimitOrderObject>(maker_id)?;
        } else {
            self.store
                .modify::<LimitOrderObject, _>(maker_id, |order| order.for_sale = maker_left)?;
            let still_receives = self
                .store
                .get::<LimitOrderObject>(maker_id)?
                .amount_to_receive()
                .map(|asset| asset.is_positive())
                .unwrap_or(false);
            if !still_receives {
                self.remove_order(maker_id)?;
            }
        }

        offered.checked_sub(&taker_pays).ok_or(BlockchainError::Overflow)
    }

    /// Close an order and refund what it still has for sale.
    pub(crate) fn remove_order(&mut self, id: ObjectId) -> Result<(), BlockchainError> {
        let order = self.store.remove::<LimitOrderObject>(id)?;
        self.adjust_liquid_balance(&order.seller, &order.amount_for_sale())?;
        if log_enabled!(Level::Debug) {
            debug!("order {} of {} closed, refunded {}", order.order_id, order.seller, order.amount_for_sale());
        }
        Ok(())
    }

    pub(crate) fn cancel_limit_order(&mut self, seller: &AccountName, order_id: u32) -> Result<(), BlockchainError> {
        let id = self
            .find_order_id(seller, order_id)
            .ok_or_else(|| BlockchainError::UnknownOrder {
                owner: seller.clone(),
                order_id,
            })?;
        self.remove_order(id)
    }

    pub(super) fn clear_expired_orders(&mut self, now: TimestampSeconds) -> Result<(), BlockchainError> {
        let expired: Vec<ObjectId> = self
            .store
            .iter_index::<LimitOrderObject>(LimitOrderObject::BY_EXPIRATION, &IndexKey::new())
            .take_while(|order| order.expiration <= now)
            .map(|order| order.id)
            .collect();
        for id in expired {
            self.remove_order(id)?;
        }
        Ok(())
    }
}
