use super::Evaluator;
use crate::core::{database::Database, error::BlockchainError, objects::AssetObject};
use ezira_common::operation::{AssetCreateOperation, AssetIssueOperation};
use log::info;

impl Evaluator for AssetCreateOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let now = db.head_block_time()?;
        db.get_account(&self.issuer)?;
        if db.find_asset(&self.symbol).is_some() {
            return Err(BlockchainError::AssetExists(self.symbol.clone()));
        }

        db.store_mut().create(AssetObject {
            id: 0,
            symbol: self.symbol.clone(),
            asset_type: self.asset_type,
            issuer: self.issuer.clone(),
            total_supply: 0,
            max_supply: self.max_supply,
            unstake_intervals: self.unstake_intervals,
            liquid_interest_rate: self.liquid_interest_rate,
            staked_interest_rate: self.staked_interest_rate,
            savings_interest_rate: self.savings_interest_rate,
            created: now,
        })?;
        info!("asset {} created by {}", self.symbol, self.issuer);
        Ok(())
    }
}

impl Evaluator for AssetIssueOperation {
    fn apply(&self, db: &mut Database) -> Result<(), BlockchainError> {
        let asset = db.get_asset(&self.amount.symbol)?;
        if asset.issuer != self.issuer {
            return Err(BlockchainError::AccountRule("only the issuer can issue an asset"));
        }
        db.get_account(&self.to)?;

        db.adjust_supply(&self.amount)?;
        db.adjust_liquid_balance(&self.to, &self.amount)?;
        info!("{} issued {} to {}", self.issuer, self.amount, self.to);
        Ok(())
    }
}
