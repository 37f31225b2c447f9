use crate::{
    core::store::{IndexKey, ObjectId, Table},
    impl_object,
};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Price, Symbol},
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

/// Open offer to sell `for_sale` units of `sell_price.base` at `sell_price`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderObject {
    pub id: ObjectId,
    pub seller: AccountName,
    pub order_id: u32,
    pub created: TimestampSeconds,
    pub expiration: TimestampSeconds,
    pub for_sale: i64,
    pub sell_price: Price,
}

impl_object!(LimitOrderObject, Table::LimitOrders, {
    BY_ACCOUNT: unique => |o| LimitOrderObject::order_key(&o.seller, o.order_id),
    BY_MARKET: non_unique => |o| LimitOrderObject::market_key(&o.sell_price.base.symbol, &o.sell_price.quote.symbol),
    BY_EXPIRATION: non_unique => |o| IndexKey::new().with_time(o.expiration),
});

impl LimitOrderObject {
    pub fn order_key(seller: &AccountName, order_id: u32) -> IndexKey {
        IndexKey::new().with_str(seller.as_str()).with_u32(order_id)
    }

    pub fn market_key(sell: &Symbol, receive: &Symbol) -> IndexKey {
        IndexKey::new().with_str(sell.as_str()).with_str(receive.as_str())
    }

    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.symbol.clone())
    }

    pub fn amount_to_receive(&self) -> Option<Asset> {
        self.sell_price.convert(&self.amount_for_sale())
    }
}
