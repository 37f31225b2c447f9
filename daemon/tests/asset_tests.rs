mod common;

use common::{TestChain, COIN};
use ezira_common::{
    asset::{Asset, AssetType, Symbol},
    config::{CREDIT_INTERVAL_BLOCKS, MAX_ASSET_SUPPLY},
    operation::{
        AssetCreateOperation, AssetIssueOperation, StakeAssetOperation, TransferToSavingsOperation,
    },
    time::SECONDS_PER_DAY,
};
use ezira_daemon::{
    config::{CREDIT_LIQUID_INTEREST_RATE, CREDIT_SAVINGS_INTEREST_RATE, CREDIT_STAKED_INTEREST_RATE},
    core::{database::accrued_interest, objects::BalanceKind, BlockchainError},
};
use std::error::Error;

fn gold(amount: i64) -> Asset {
    Asset::new(amount, Symbol::new("GOLD"))
}

fn create_gold(issuer: &str, max_supply: i64) -> AssetCreateOperation {
    AssetCreateOperation {
        issuer: issuer.into(),
        symbol: Symbol::new("GOLD"),
        asset_type: AssetType::Currency,
        max_supply,
        unstake_intervals: 2,
        liquid_interest_rate: 0,
        staked_interest_rate: 0,
        savings_interest_rate: 0,
    }
}

fn issue(issuer: &str, to: &str, amount: Asset) -> AssetIssueOperation {
    AssetIssueOperation {
        issuer: issuer.into(),
        to: to.into(),
        amount,
    }
}

#[test]
fn test_issuer_controls_supply() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;

    chain.push(&["alice"], create_gold("alice", 100 * COIN))?;
    let err = chain.push(&["bob"], create_gold("bob", 100 * COIN)).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AssetExists(_)));

    let err = chain.push(&["bob"], issue("bob", "bob", gold(COIN))).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AccountRule(_)));

    chain.push(&["alice"], issue("alice", "bob", gold(60 * COIN)))?;
    let err = chain
        .push(&["alice"], issue("alice", "alice", gold(50 * COIN)))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::SupplyExceeded { .. }));
    chain.generate_block()?;

    let asset = chain.db.get_asset(&Symbol::new("GOLD"))?;
    assert_eq!(asset.total_supply, 60 * COIN);
    assert_eq!(asset.unstake_intervals, 2);
    assert_eq!(
        chain
            .db
            .get_balance(&"bob".into(), &Symbol::new("GOLD"), BalanceKind::Liquid)
            .amount,
        60 * COIN
    );

    let err = chain
        .push(&["alice"], issue("alice", "bob", Asset::new(COIN, Symbol::new("SILVER"))))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownAsset(_)));
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_only_credit_assets_pay_interest() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 10 * COIN)?;

    let mut op = create_gold("alice", MAX_ASSET_SUPPLY);
    op.liquid_interest_rate = 100;
    let err = chain.push(&["alice"], op.clone()).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::Validation(_)));

    op.asset_type = AssetType::Credit;
    chain.push(&["alice"], op)?;
    assert_eq!(chain.db.get_asset(&Symbol::new("GOLD"))?.liquid_interest_rate, 100);
    Ok(())
}

#[test]
fn test_credit_interest_is_paid_on_every_balance() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 10 * COIN)?;
    let credit = |amount: i64| Asset::new(amount, Symbol::credit());

    chain.push(&["genesis"], issue("genesis", "alice", credit(1_000 * COIN)))?;
    chain.push(
        &["alice"],
        StakeAssetOperation {
            from: "alice".into(),
            to: "alice".into(),
            amount: credit(400 * COIN),
        },
    )?;
    chain.push(
        &["alice"],
        TransferToSavingsOperation {
            from: "alice".into(),
            to: "alice".into(),
            amount: credit(100 * COIN),
            memo: String::new(),
        },
    )?;
    chain.generate_block()?;
    let since = chain
        .db
        .find_balance(&"alice".into(), &Symbol::credit())
        .map(|balance| balance.last_interest_time)
        .ok_or("missing balance")?;

    // Let a day pass, then run up to the next interest block
    chain.generate_block_at(chain.now() + SECONDS_PER_DAY)?;
    while u64::from(chain.head_num()) < CREDIT_INTERVAL_BLOCKS {
        chain.generate_block()?;
    }
    let now = chain.now();
    let elapsed = now - since;

    let balance = chain
        .db
        .find_balance(&"alice".into(), &Symbol::credit())
        .ok_or("missing balance")?;
    assert_eq!(balance.last_interest_time, now);
    let liquid = 500 * COIN + accrued_interest(500 * COIN, CREDIT_LIQUID_INTEREST_RATE, elapsed);
    let staked = 400 * COIN + accrued_interest(400 * COIN, CREDIT_STAKED_INTEREST_RATE, elapsed);
    let savings = 100 * COIN + accrued_interest(100 * COIN, CREDIT_SAVINGS_INTEREST_RATE, elapsed);
    assert!(liquid > 500 * COIN);
    assert_eq!(balance.liquid, liquid);
    assert_eq!(balance.staked, staked);
    assert_eq!(balance.savings, savings);

    let supply = chain.db.get_asset(&Symbol::credit())?.total_supply;
    assert_eq!(supply, liquid + staked + savings);
    chain.db.validate_invariants()?;
    Ok(())
}
