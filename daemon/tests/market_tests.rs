mod common;

use common::{coin, TestChain, COIN};
use ezira_common::{
    asset::{Asset, Symbol},
    operation::{AssetIssueOperation, LimitOrderCancelOperation, LimitOrderCreateOperation},
};
use ezira_daemon::core::{objects::BalanceKind, BlockchainError};
use std::error::Error;

fn usd(amount: i64) -> Asset {
    Asset::new(amount, Symbol::usd())
}

fn usd_balance(chain: &TestChain, name: &str) -> i64 {
    chain
        .db
        .get_balance(&name.into(), &Symbol::usd(), BalanceKind::Liquid)
        .amount
}

fn order(
    owner: &str,
    order_id: u32,
    amount_to_sell: Asset,
    min_to_receive: Asset,
    expiration: u64,
    fill_or_kill: bool,
) -> LimitOrderCreateOperation {
    LimitOrderCreateOperation {
        owner: owner.into(),
        order_id,
        amount_to_sell,
        min_to_receive,
        fill_or_kill,
        expiration,
    }
}

// alice sells COIN, bob holds stablecoins issued by genesis
fn setup() -> Result<TestChain, BlockchainError> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 1_000 * COIN)?;
    chain.push(
        &["genesis"],
        AssetIssueOperation {
            issuer: "genesis".into(),
            to: "bob".into(),
            amount: usd(1_000 * COIN),
        },
    )?;
    chain.generate_block()?;
    Ok(chain)
}

#[test]
fn test_orders_fill_at_maker_price() -> Result<(), Box<dyn Error>> {
    let mut chain = setup()?;
    let expiration = chain.now() + 3_600;

    // 2 MUSD per COIN
    chain.push(
        &["alice"],
        order("alice", 1, coin(100 * COIN), usd(200 * COIN), expiration, false),
    )?;
    assert_eq!(chain.liquid("alice"), 900 * COIN);

    // bob would accept 2.5 MUSD per COIN and gets the better maker price
    chain.push(
        &["bob"],
        order("bob", 1, usd(100 * COIN), coin(40 * COIN), expiration, false),
    )?;
    assert!(chain.db.find_limit_order(&"bob".into(), 1).is_none());
    assert_eq!(usd_balance(&chain, "bob"), 900 * COIN);
    assert_eq!(chain.liquid("bob"), 1_050 * COIN);
    assert_eq!(usd_balance(&chain, "alice"), 100 * COIN);

    let maker = chain
        .db
        .find_limit_order(&"alice".into(), 1)
        .ok_or("missing order")?;
    assert_eq!(maker.for_sale, 50 * COIN);
    chain.generate_block()?;
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_orders_that_do_not_cross_rest_in_the_book() -> Result<(), Box<dyn Error>> {
    let mut chain = setup()?;
    let expiration = chain.now() + 3_600;

    chain.push(
        &["alice"],
        order("alice", 1, coin(100 * COIN), usd(200 * COIN), expiration, false),
    )?;
    // bob only pays 1.5 MUSD per COIN
    chain.push(
        &["bob"],
        order("bob", 7, usd(150 * COIN), coin(100 * COIN), expiration, false),
    )?;
    assert_eq!(
        chain.db.find_limit_order(&"bob".into(), 7).map(|o| o.for_sale),
        Some(150 * COIN)
    );
    assert_eq!(
        chain.db.find_limit_order(&"alice".into(), 1).map(|o| o.for_sale),
        Some(100 * COIN)
    );

    let err = chain
        .push(
            &["bob"],
            order("bob", 7, usd(10 * COIN), coin(5 * COIN), expiration, false),
        )
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::OrderExists { .. }));
    Ok(())
}

#[test]
fn test_fill_or_kill_leaves_no_trace() -> Result<(), Box<dyn Error>> {
    let mut chain = setup()?;
    let expiration = chain.now() + 3_600;
    chain.push(
        &["alice"],
        order("alice", 1, coin(50 * COIN), usd(100 * COIN), expiration, false),
    )?;

    let err = chain
        .push(
            &["bob"],
            order("bob", 2, usd(300 * COIN), coin(100 * COIN), expiration, true),
        )
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::MarketRule(_)));
    assert_eq!(usd_balance(&chain, "bob"), 1_000 * COIN);
    assert_eq!(
        chain.db.find_limit_order(&"alice".into(), 1).map(|o| o.for_sale),
        Some(50 * COIN)
    );

    // Filled in full, nothing rests
    chain.push(
        &["bob"],
        order("bob", 2, usd(100 * COIN), coin(50 * COIN), expiration, true),
    )?;
    assert!(chain.db.find_limit_order(&"alice".into(), 1).is_none());
    assert!(chain.db.find_limit_order(&"bob".into(), 2).is_none());
    assert_eq!(chain.liquid("bob"), 1_050 * COIN);
    Ok(())
}

#[test]
fn test_cancel_and_expiry_refund_the_seller() -> Result<(), Box<dyn Error>> {
    let mut chain = setup()?;
    let now = chain.now();

    let err = chain
        .push(&["alice"], order("alice", 1, coin(COIN), usd(COIN), now, false))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::MarketRule(_)));

    chain.push(
        &["alice"],
        order("alice", 1, coin(100 * COIN), usd(200 * COIN), now + 3_600, false),
    )?;
    chain.push(
        &["alice"],
        order("alice", 2, coin(10 * COIN), usd(20 * COIN), now + 60, false),
    )?;
    assert_eq!(chain.liquid("alice"), 890 * COIN);

    let cancel = LimitOrderCancelOperation {
        owner: "alice".into(),
        order_id: 1,
    };
    chain.push(&["alice"], cancel.clone())?;
    assert_eq!(chain.liquid("alice"), 990 * COIN);
    let err = chain.push(&["alice"], cancel).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownOrder { .. }));

    chain.generate_block_at(now + 60)?;
    assert!(chain.db.find_limit_order(&"alice".into(), 2).is_none());
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}
