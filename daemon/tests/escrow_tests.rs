mod common;

use common::{coin, TestChain, COIN};
use ezira_common::{
    account::AccountName,
    config::{ESCROW_DISPUTE_DURATION, PERCENT_100},
    operation::{
        EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
        EscrowTransferOperation, UpdateMediatorOperation,
    },
};
use ezira_daemon::core::BlockchainError;
use std::error::Error;

const ESCROW_ID: &str = "escrow-1";

fn register_mediator(chain: &mut TestChain, name: &str) -> Result<(), BlockchainError> {
    chain.push(
        &[name],
        UpdateMediatorOperation {
            account: name.into(),
            details: "fair and fast".to_string(),
            url: String::new(),
            json: String::new(),
            mediator_bond: coin(COIN),
            active: true,
        },
    )
}

fn setup(mediators: &[&str]) -> Result<TestChain, BlockchainError> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 1_000 * COIN)?;
    chain.create_funded_accounts(mediators, 100 * COIN)?;
    for mediator in mediators {
        register_mediator(&mut chain, mediator)?;
    }
    chain.generate_block()?;
    Ok(chain)
}

fn propose(chain: &mut TestChain, amount: i64) -> Result<(), BlockchainError> {
    let now = chain.now();
    chain.push(
        &["alice"],
        EscrowTransferOperation {
            account: "alice".into(),
            from: "alice".into(),
            to: "bob".into(),
            escrow_id: ESCROW_ID.to_string(),
            amount: coin(amount),
            acceptance_time: now + 3_600,
            escrow_expiration: now + 7_200,
            memo: "first batch".to_string(),
            json: String::new(),
        },
    )
}

fn approve(chain: &mut TestChain, account: &str, mediator: &str, approved: bool) -> Result<(), BlockchainError> {
    chain.push(
        &[account],
        EscrowApproveOperation {
            account: account.into(),
            mediator: AccountName::new(mediator),
            escrow_from: "alice".into(),
            escrow_id: ESCROW_ID.to_string(),
            approved,
        },
    )
}

fn release(chain: &mut TestChain, account: &str, percent: u16) -> Result<(), BlockchainError> {
    chain.push(
        &[account],
        EscrowReleaseOperation {
            account: account.into(),
            escrow_from: "alice".into(),
            escrow_id: ESCROW_ID.to_string(),
            release_percent: percent,
        },
    )
}

fn fully_approve(chain: &mut TestChain) -> Result<(), BlockchainError> {
    approve(chain, "alice", "mediator1", true)?;
    approve(chain, "bob", "mediator2", true)?;
    approve(chain, "mediator1", "", true)?;
    approve(chain, "mediator2", "", true)
}

#[test]
fn test_escrow_release_to_receiver() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    // A proposal deposits nothing
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);

    fully_approve(&mut chain)?;
    let escrow = chain.db.get_escrow(&"alice".into(), ESCROW_ID)?;
    assert!(escrow.is_approved());
    assert_eq!(escrow.balance.amount, 140 * COIN);
    assert_eq!(chain.liquid("alice"), 890 * COIN);
    assert_eq!(chain.liquid("mediator1"), 90 * COIN);
    chain.generate_block()?;
    chain.db.validate_invariants()?;

    release(&mut chain, "alice", PERCENT_100)?;
    chain.generate_block()?;

    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 900 * COIN);
    assert_eq!(chain.liquid("bob"), 1_100 * COIN);
    assert_eq!(chain.liquid("mediator1"), 100 * COIN);
    assert_eq!(chain.liquid("mediator2"), 100 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_escrow_release_direction() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    fully_approve(&mut chain)?;

    let err = release(&mut chain, "bob", PERCENT_100).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));
    assert_eq!(err.operation_index(), Some(0));

    let err = release(&mut chain, "mediator1", 0).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));

    // The receiver can give everything back
    release(&mut chain, "bob", 0)?;
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);
    assert_eq!(chain.liquid("bob"), 1_000 * COIN);
    Ok(())
}

#[test]
fn test_escrow_rejection_refunds_deposits() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    approve(&mut chain, "alice", "mediator1", true)?;
    assert_eq!(chain.liquid("alice"), 890 * COIN);

    approve(&mut chain, "bob", "", false)?;
    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);
    assert_eq!(chain.liquid("bob"), 1_000 * COIN);
    Ok(())
}

#[test]
fn test_escrow_approval_rules() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    chain.create_funded_accounts(&["carol"], 100 * COIN)?;
    propose(&mut chain, 100 * COIN)?;

    // Mediators must be registered and active
    let err = approve(&mut chain, "alice", "carol", true).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownMediator(_)));

    let err = approve(&mut chain, "carol", "", true).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));

    approve(&mut chain, "alice", "mediator1", true)?;
    let err = approve(&mut chain, "alice", "mediator1", true).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));

    // No more edits once a party deposited
    let err = propose(&mut chain, 50 * COIN).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowExists { .. }));
    Ok(())
}

#[test]
fn test_unapproved_escrow_is_refunded_at_acceptance_time() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    approve(&mut chain, "alice", "mediator1", true)?;
    chain.generate_block()?;
    let acceptance_time = chain.db.get_escrow(&"alice".into(), ESCROW_ID)?.acceptance_time;

    chain.generate_block_at(acceptance_time)?;
    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_disputed_escrow_settles_at_median() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2", "mediator3", "mediator4", "mediator5"])?;
    propose(&mut chain, 100 * COIN)?;
    fully_approve(&mut chain)?;
    chain.generate_block()?;

    let dispute_time = chain.now();
    chain.push(
        &["bob"],
        EscrowDisputeOperation {
            account: "bob".into(),
            escrow_from: "alice".into(),
            escrow_id: ESCROW_ID.to_string(),
        },
    )?;
    let escrow = chain.db.get_escrow(&"alice".into(), ESCROW_ID)?;
    assert!(escrow.disputed);
    assert_eq!(escrow.dispute_release_time, dispute_time + ESCROW_DISPUTE_DURATION);
    let panel: Vec<&str> = escrow.mediators.iter().map(|m| m.as_str()).collect();
    assert_eq!(panel, vec!["mediator3", "mediator4", "mediator5"]);

    // Regular releases are over, only votes count now
    let err = approve(&mut chain, "mediator1", "", true).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));
    approve(&mut chain, "mediator3", "", true)?;
    assert_eq!(chain.liquid("mediator3"), 90 * COIN);

    // Bob never votes and forfeits his bond
    release(&mut chain, "alice", 0)?;
    release(&mut chain, "mediator1", 5_000)?;
    release(&mut chain, "mediator2", 5_000)?;
    release(&mut chain, "mediator3", PERCENT_100)?;
    let err = release(&mut chain, "mediator4", PERCENT_100).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::EscrowRule(_)));
    chain.generate_block()?;
    chain.db.validate_invariants()?;

    chain.generate_block_at(dispute_time + ESCROW_DISPUTE_DURATION)?;
    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 955 * COIN);
    assert_eq!(chain.liquid("bob"), 1_045 * COIN);
    for mediator in ["mediator1", "mediator2", "mediator3", "mediator4"] {
        assert_eq!(chain.liquid(mediator), 100 * COIN);
    }
    chain.db.validate_invariants()?;
    Ok(())
}

fn dispute(chain: &mut TestChain, account: &str) -> Result<(), BlockchainError> {
    chain.push(
        &[account],
        EscrowDisputeOperation {
            account: account.into(),
            escrow_from: "alice".into(),
            escrow_id: ESCROW_ID.to_string(),
        },
    )
}

#[test]
fn test_approved_escrow_is_refunded_at_expiration() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    fully_approve(&mut chain)?;
    chain.generate_block()?;
    let expiration = chain.db.get_escrow(&"alice".into(), ESCROW_ID)?.escrow_expiration;
    assert_eq!(chain.liquid("alice"), 890 * COIN);

    chain.generate_block_at(expiration)?;
    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 1_000 * COIN);
    assert_eq!(chain.liquid("bob"), 1_000 * COIN);
    assert_eq!(chain.liquid("mediator1"), 100 * COIN);
    assert_eq!(chain.liquid("mediator2"), 100 * COIN);
    chain.db.validate_invariants()?;

    // Too late to dispute or release
    let err = dispute(&mut chain, "bob").unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownEscrow { .. }));
    let err = release(&mut chain, "alice", PERCENT_100).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::UnknownEscrow { .. }));
    assert_eq!(chain.liquid("bob"), 1_000 * COIN);
    Ok(())
}

#[test]
fn test_dispute_without_votes_stays_open() -> Result<(), Box<dyn Error>> {
    let mut chain = setup(&["mediator1", "mediator2"])?;
    propose(&mut chain, 100 * COIN)?;
    fully_approve(&mut chain)?;
    chain.generate_block()?;

    let dispute_time = chain.now();
    dispute(&mut chain, "bob")?;
    chain.generate_block()?;

    // Nobody voted, the escrow keeps every deposit and waits for votes
    let closing = dispute_time + ESCROW_DISPUTE_DURATION;
    chain.generate_block_at(closing)?;
    let escrow = chain.db.get_escrow(&"alice".into(), ESCROW_ID)?;
    assert!(escrow.disputed);
    assert_eq!(escrow.balance.amount, 140 * COIN);
    assert_eq!(escrow.dispute_release_time, closing + ESCROW_DISPUTE_DURATION);
    assert_eq!(chain.liquid("alice"), 890 * COIN);
    assert_eq!(chain.liquid("bob"), 990 * COIN);
    chain.db.validate_invariants()?;

    // A single vote settles it once the new window closes
    release(&mut chain, "alice", PERCENT_100)?;
    chain.generate_block_at(closing + ESCROW_DISPUTE_DURATION)?;
    assert!(chain.db.find_escrow(&"alice".into(), ESCROW_ID).is_none());
    assert_eq!(chain.liquid("alice"), 900 * COIN);
    // The payment plus the forfeited bonds of bob and both mediators
    assert_eq!(chain.liquid("bob"), 1_120 * COIN);
    assert_eq!(chain.liquid("mediator1"), 90 * COIN);
    assert_eq!(chain.liquid("mediator2"), 90 * COIN);
    chain.db.validate_invariants()?;
    Ok(())
}
