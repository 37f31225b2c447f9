use super::{validate_account_name, validate_percent, validate_positive, validate_symbol, OperationType};
use crate::{
    account::AccountName,
    asset::{Asset, AssetType, Symbol},
    authority::{AuthorityLevel, RequiredAuthorities},
    config::MAX_ASSET_SUPPLY,
    error::ValidationError,
};
use serde::{Deserialize, Serialize};

/// Create a new asset controlled by `issuer`.
///
/// Interest rates are yearly basis points and only allowed on credit assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCreateOperation {
    pub issuer: AccountName,
    pub symbol: Symbol,
    pub asset_type: AssetType,
    pub max_supply: i64,
    pub unstake_intervals: u16,
    pub liquid_interest_rate: u16,
    pub staked_interest_rate: u16,
    pub savings_interest_rate: u16,
}

impl_serializer!(AssetCreateOperation {
    issuer,
    symbol,
    asset_type,
    max_supply,
    unstake_intervals,
    liquid_interest_rate,
    staked_interest_rate,
    savings_interest_rate
});

impl AssetCreateOperation {
    fn has_interest(&self) -> bool {
        self.liquid_interest_rate > 0 || self.staked_interest_rate > 0 || self.savings_interest_rate > 0
    }
}

impl OperationType for AssetCreateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.issuer)?;
        validate_symbol(&self.symbol)?;
        if self.max_supply <= 0 || self.max_supply > MAX_ASSET_SUPPLY {
            return Err(ValidationError::AmountOutOfRange(self.max_supply));
        }
        if self.unstake_intervals == 0 {
            return Err(ValidationError::InvalidParameters("unstake intervals must be positive"));
        }
        validate_percent(self.liquid_interest_rate)?;
        validate_percent(self.staked_interest_rate)?;
        validate_percent(self.savings_interest_rate)?;
        if self.has_interest() && self.asset_type != AssetType::Credit {
            return Err(ValidationError::InvalidParameters(
                "only credit assets can pay interest",
            ));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.issuer, AuthorityLevel::Active);
    }
}

/// Mint new units of an asset into an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIssueOperation {
    pub issuer: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl_serializer!(AssetIssueOperation { issuer, to, amount });

impl OperationType for AssetIssueOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.issuer)?;
        validate_account_name(&self.to)?;
        validate_positive(&self.amount)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.issuer, AuthorityLevel::Active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(asset_type: AssetType, rate: u16) -> AssetCreateOperation {
        AssetCreateOperation {
            issuer: "alice".into(),
            symbol: Symbol::new("GOLD"),
            asset_type,
            max_supply: 1_000_000,
            unstake_intervals: 4,
            liquid_interest_rate: rate,
            staked_interest_rate: 0,
            savings_interest_rate: 0,
        }
    }

    #[test]
    fn test_interest_only_on_credit() {
        assert!(create(AssetType::Credit, 500).validate().is_ok());
        assert!(create(AssetType::Currency, 0).validate().is_ok());
        assert!(create(AssetType::Currency, 500).validate().is_err());
    }

    #[test]
    fn test_supply_bounds() {
        let mut op = create(AssetType::Currency, 0);
        op.max_supply = 0;
        assert!(matches!(op.validate(), Err(ValidationError::AmountOutOfRange(0))));
    }
}
