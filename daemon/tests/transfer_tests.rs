mod common;

use common::{coin, TestChain, COIN};
use ezira_common::{
    config::STAKE_WITHDRAW_INTERVAL,
    operation::{
        StakeAssetOperation, TransferFromSavingsOperation, TransferOperation,
        TransferRecurringOperation, TransferToSavingsOperation, UnstakeAssetOperation,
        UnstakeAssetRouteOperation,
    },
    time::{SECONDS_PER_HOUR, TIME_MAX},
};
use ezira_daemon::core::{objects::BalanceKind, BlockchainError};
use std::error::Error;

fn transfer(chain: &mut TestChain, from: &str, to: &str, amount: i64) -> Result<(), BlockchainError> {
    chain.push(
        &[from],
        TransferOperation {
            from: from.into(),
            to: to.into(),
            amount: coin(amount),
            memo: String::new(),
        },
    )
}

fn recurring(from: &str, to: &str, amount: i64, begin: u64, payments: u32) -> TransferRecurringOperation {
    TransferRecurringOperation {
        from: from.into(),
        to: to.into(),
        amount: coin(amount),
        transfer_id: "rent".to_string(),
        begin,
        payments,
        interval: SECONDS_PER_HOUR,
        memo: String::new(),
        extensible: false,
        fill_or_kill: false,
        active: true,
    }
}

#[test]
fn test_transfer_checks_funds_and_accounts() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;

    let err = transfer(&mut chain, "alice", "bob", 20 * COIN).unwrap_err();
    assert!(matches!(
        err.root(),
        BlockchainError::InsufficientFunds { kind: BalanceKind::Liquid, .. }
    ));

    let err = transfer(&mut chain, "alice", "ghost", COIN).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownAccount(_)));

    transfer(&mut chain, "alice", "bob", 4 * COIN)?;
    chain.generate_block()?;
    assert_eq!(chain.liquid("alice"), 6 * COIN);
    assert_eq!(chain.liquid("bob"), 14 * COIN);
    Ok(())
}

#[test]
fn test_savings_withdrawal_completes_after_delay() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 100 * COIN)?;

    chain.push(
        &["alice"],
        TransferToSavingsOperation {
            from: "alice".into(),
            to: "alice".into(),
            amount: coin(50 * COIN),
            memo: String::new(),
        },
    )?;
    let withdraw = |request_id: &str, amount: i64, transferred: bool| TransferFromSavingsOperation {
        from: "alice".into(),
        to: "bob".into(),
        amount: coin(amount),
        request_id: request_id.to_string(),
        memo: String::new(),
        transferred,
    };
    chain.push(&["alice"], withdraw("w1", 20 * COIN, true))?;
    chain.push(&["alice"], withdraw("w2", 10 * COIN, true))?;
    assert_eq!(chain.balance("alice", BalanceKind::Savings), 20 * COIN);

    chain.push(&["alice"], withdraw("w2", 0, false))?;
    assert_eq!(chain.balance("alice", BalanceKind::Savings), 30 * COIN);
    let err = chain.push(&["alice"], withdraw("w3", 0, false)).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownSavingsWithdraw { .. }));
    chain.generate_block()?;

    let complete = chain
        .db
        .find_savings_withdraw(&"alice".into(), "w1")
        .map(|w| w.complete)
        .ok_or("missing withdrawal")?;
    chain.generate_block_at(complete - 3)?;
    assert_eq!(chain.liquid("bob"), 100 * COIN);

    chain.generate_block_at(complete)?;
    assert!(chain.db.find_savings_withdraw(&"alice".into(), "w1").is_none());
    assert_eq!(chain.liquid("bob"), 120 * COIN);
    assert_eq!(chain.liquid("alice"), 50 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_unstake_pays_routes_every_interval() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob", "carol"], 100 * COIN)?;

    chain.push(
        &["alice"],
        StakeAssetOperation {
            from: "alice".into(),
            to: "alice".into(),
            amount: coin(100 * COIN),
        },
    )?;
    let route = |to: &str, percent: u16| UnstakeAssetRouteOperation {
        from: "alice".into(),
        to: to.into(),
        percent,
        auto_stake: false,
    };
    chain.push(&["alice"], route("bob", 5_000))?;
    let err = chain.push(&["alice"], route("carol", 6_000)).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::TransferRule(_)));

    chain.push(
        &["alice"],
        UnstakeAssetOperation {
            account: "alice".into(),
            amount: coin(100 * COIN),
        },
    )?;
    chain.generate_block()?;
    assert_eq!(chain.balance("alice", BalanceKind::Staked), 101 * COIN);

    let mut next = chain
        .db
        .find_balance(&"alice".into(), &coin(0).symbol)
        .map(|b| b.next_unstake_time)
        .ok_or("missing balance")?;
    for payment in 1..=4 {
        chain.generate_block_at(next)?;
        assert_eq!(chain.balance("alice", BalanceKind::Staked), (101 - 25 * payment) * COIN);
        next += STAKE_WITHDRAW_INTERVAL;
    }

    let balance = chain
        .db
        .find_balance(&"alice".into(), &coin(0).symbol)
        .ok_or("missing balance")?;
    assert!(!balance.is_unstaking());
    assert_eq!(balance.next_unstake_time, TIME_MAX);
    assert_eq!(chain.liquid("alice"), 50 * COIN);
    assert_eq!(chain.liquid("bob"), 150 * COIN);
    assert_eq!(chain.liquid("carol"), 100 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_recurring_transfer_runs_its_payments() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 100 * COIN)?;
    let begin = chain.now() + SECONDS_PER_HOUR;

    chain.push(&["alice"], recurring("alice", "bob", 10 * COIN, begin, 3))?;
    chain.generate_block()?;
    assert_eq!(chain.liquid("alice"), 100 * COIN);

    for payment in 0..3 {
        chain.generate_block_at(begin + payment * SECONDS_PER_HOUR)?;
    }
    assert_eq!(chain.liquid("alice"), 70 * COIN);
    assert_eq!(chain.liquid("bob"), 130 * COIN);
    assert!(chain.db.find_recurring_transfer(&"alice".into(), "rent").is_none());
    Ok(())
}

#[test]
fn test_fill_or_kill_recurring_transfer_is_cancelled() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 15 * COIN)?;
    let begin = chain.now() + SECONDS_PER_HOUR;

    let mut op = recurring("alice", "bob", 10 * COIN, begin, 3);
    op.fill_or_kill = true;
    chain.push(&["alice"], op)?;

    chain.generate_block_at(begin)?;
    assert_eq!(chain.liquid("bob"), 25 * COIN);
    chain.generate_block_at(begin + SECONDS_PER_HOUR)?;
    assert!(chain.db.find_recurring_transfer(&"alice".into(), "rent").is_none());
    assert_eq!(chain.liquid("alice"), 5 * COIN);
    assert_eq!(chain.liquid("bob"), 25 * COIN);
    Ok(())
}

#[test]
fn test_extensible_recurring_transfer_is_pushed_back() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 15 * COIN)?;
    let begin = chain.now() + SECONDS_PER_HOUR;

    let mut op = recurring("alice", "bob", 10 * COIN, begin, 2);
    op.extensible = true;
    chain.push(&["alice"], op)?;

    chain.generate_block_at(begin)?;
    chain.generate_block_at(begin + SECONDS_PER_HOUR)?;
    let transfer = chain
        .db
        .find_recurring_transfer(&"alice".into(), "rent")
        .ok_or("missing recurring transfer")?;
    assert_eq!(transfer.payments_remaining, 1);
    assert_eq!(transfer.next_transfer, begin + 2 * SECONDS_PER_HOUR);
    assert_eq!(transfer.end, begin + 2 * SECONDS_PER_HOUR);

    chain.fund("alice", 10 * COIN)?;
    chain.generate_block_at(begin + 2 * SECONDS_PER_HOUR)?;
    assert!(chain.db.find_recurring_transfer(&"alice".into(), "rent").is_none());
    assert_eq!(chain.liquid("bob"), 35 * COIN);
    Ok(())
}

#[test]
fn test_recurring_transfer_rules() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 15 * COIN)?;
    let now = chain.now();

    let err = chain
        .push(&["alice"], recurring("alice", "bob", 10 * COIN, now - 3, 2))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::TransferRule(_)));

    let err = chain
        .push(&["alice"], recurring("alice", "bob", 20 * COIN, now, 2))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::InsufficientFunds { .. }));

    let mut cancel = recurring("alice", "bob", 10 * COIN, now, 2);
    cancel.active = false;
    let err = chain.push(&["alice"], cancel.clone()).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownRecurringTransfer { .. }));

    chain.push(&["alice"], recurring("alice", "bob", 10 * COIN, now, 2))?;
    chain.push(&["alice"], cancel)?;
    assert!(chain.db.find_recurring_transfer(&"alice".into(), "rent").is_none());
    Ok(())
}
