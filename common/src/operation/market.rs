use super::{validate_account_name, validate_positive, OperationType};
use crate::{
    account::AccountName,
    asset::{Asset, Price},
    authority::{AuthorityLevel, RequiredAuthorities},
    error::ValidationError,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

/// Offer `amount_to_sell` for at least `min_to_receive`.
///
/// The order fills against the book at the maker's price and rests with the
/// remainder, unless `fill_or_kill` requires an immediate complete fill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCreateOperation {
    pub owner: AccountName,
    pub order_id: u32,
    pub amount_to_sell: Asset,
    pub min_to_receive: Asset,
    pub fill_or_kill: bool,
    pub expiration: TimestampSeconds,
}

impl_serializer!(LimitOrderCreateOperation {
    owner,
    order_id,
    amount_to_sell,
    min_to_receive,
    fill_or_kill,
    expiration
});

impl LimitOrderCreateOperation {
    pub fn price(&self) -> Price {
        Price::new(self.amount_to_sell.clone(), self.min_to_receive.clone())
    }
}

impl OperationType for LimitOrderCreateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.owner)?;
        validate_positive(&self.amount_to_sell)?;
        validate_positive(&self.min_to_receive)?;
        if !self.price().is_valid() {
            return Err(ValidationError::InvalidPrice);
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.owner, AuthorityLevel::Active);
    }
}

/// Cancel an open order and refund what remains of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCancelOperation {
    pub owner: AccountName,
    pub order_id: u32,
}

impl_serializer!(LimitOrderCancelOperation { owner, order_id });

impl OperationType for LimitOrderCancelOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.owner)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.owner, AuthorityLevel::Active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Symbol;

    #[test]
    fn test_same_asset_order_rejected() {
        let op = LimitOrderCreateOperation {
            owner: "alice".into(),
            order_id: 1,
            amount_to_sell: Asset::coin(10),
            min_to_receive: Asset::coin(20),
            fill_or_kill: false,
            expiration: 1_000,
        };
        assert_eq!(op.validate(), Err(ValidationError::InvalidPrice));
    }

    #[test]
    fn test_valid_order() {
        let op = LimitOrderCreateOperation {
            owner: "alice".into(),
            order_id: 1,
            amount_to_sell: Asset::coin(10),
            min_to_receive: Asset::new(20, Symbol::usd()),
            fill_or_kill: true,
            expiration: 1_000,
        };
        assert!(op.validate().is_ok());
        assert_eq!(op.price().base, Asset::coin(10));
    }
}
