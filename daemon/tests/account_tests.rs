mod common;

use common::{coin, genesis, key_of, TestChain, COIN};
use ezira_common::{
    account::MembershipTier,
    authority::Authority,
    config::{
        MEMBERSHIP_FEE_MID, MEMBERSHIP_FEE_TOP, MEMBERSHIP_PERIOD, OWNER_AUTH_RECOVERY_PERIOD,
        RESET_ACCOUNT_DELAY_DAYS,
    },
    error::AuthorityError,
    operation::{
        AccountCreateOperation, AccountMembershipOperation, AccountUpdateOperation,
        ChangeRecoveryAccountOperation,
        RecoverAccountOperation, RequestAccountRecoveryOperation, ResetAccountOperation,
        SetResetAccountOperation, TransferOperation,
    },
    time::{SECONDS_PER_DAY, TIME_MAX},
};
use ezira_daemon::core::{objects::BalanceKind, BlockchainError};
use std::error::Error;

fn key_authority(seed: &str) -> Authority {
    Authority::from_key(key_of(seed).public_key())
}

fn update_owner(chain: &mut TestChain, signer: &str, owner: &str) -> Result<(), BlockchainError> {
    chain.push(
        &[signer],
        AccountUpdateOperation {
            account: "alice".into(),
            owner: Some(key_authority(owner)),
            active: None,
            posting: None,
            memo_key: None,
            json_metadata: String::new(),
        },
    )
}

fn owner_of(chain: &TestChain, name: &str) -> Result<Authority, BlockchainError> {
    Ok(chain.db.get_account_authority(&name.into())?.owner.clone())
}

#[test]
fn test_account_creation_moves_fee_to_stake() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    let before = chain.liquid("genesis");
    chain.create_account("alice")?;

    let account = chain.db.get_account(&"alice".into())?;
    assert_eq!(account.recovery_account, genesis());
    assert_eq!(account.reset_account, genesis());
    assert_eq!(account.reset_account_delay_days, RESET_ACCOUNT_DELAY_DAYS);
    assert_eq!(chain.balance("alice", BalanceKind::Staked), COIN);
    assert_eq!(chain.liquid("genesis"), before - COIN);

    let err = chain.create_account("alice").unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AccountExists(_)));

    let key = key_of("bob").public_key();
    let err = chain
        .push(
            &["genesis"],
            AccountCreateOperation {
                creator: genesis(),
                new_account_name: "bob".into(),
                owner: Authority::from_key(key),
                active: Authority::from_key(key),
                posting: Authority::from_key(key),
                memo_key: key,
                json_metadata: String::new(),
                fee: coin(COIN / 2),
            },
        )
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AccountRule(_)));
    assert!(chain.db.find_account(&"bob".into()).is_none());
    Ok(())
}

#[test]
fn test_signatures_must_match_authorities() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;
    let op = TransferOperation {
        from: "alice".into(),
        to: "bob".into(),
        amount: coin(COIN),
        memo: String::new(),
    };

    let err = chain.push(&["bob"], op.clone()).unwrap_err();
    assert!(matches!(
        err.root(),
        BlockchainError::Authority(AuthorityError::MissingActiveAuthority(_))
    ));

    let err = chain.push(&["alice", "bob"], op.clone()).unwrap_err();
    assert!(matches!(
        err.root(),
        BlockchainError::Authority(AuthorityError::IrrelevantSignature(_))
    ));
    assert_eq!(err.kind(), ezira_daemon::core::ErrorKind::Authority);

    chain.push(&["alice"], op)?;
    assert_eq!(chain.liquid("bob"), 11 * COIN);
    Ok(())
}

#[test]
fn test_owner_update_is_rate_limited() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 10 * COIN)?;

    update_owner(&mut chain, "alice", "alice-owner")?;
    assert_eq!(owner_of(&chain, "alice")?, key_authority("alice-owner"));

    let err = update_owner(&mut chain, "alice-owner", "alice-owner2").unwrap_err();
    assert!(matches!(err.root(), BlockchainError::OwnerUpdateTooSoon { .. }));
    Ok(())
}

#[test]
fn test_stolen_account_is_recovered() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;

    // Mallory steals the keys and replaces the owner
    update_owner(&mut chain, "alice", "mallory")?;
    chain.generate_block()?;

    // Only the recovery partner may request
    let request = |recovery: &str, owner: Authority| RequestAccountRecoveryOperation {
        recovery_account: recovery.into(),
        account_to_recover: "alice".into(),
        new_owner_authority: owner,
    };
    let err = chain
        .push(&["bob"], request("bob", key_authority("alice-new")))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::RecoveryRule(_)));
    chain.push(&["genesis"], request("genesis", key_authority("alice-new")))?;

    // The recent owner must come from the history
    let err = chain
        .push(
            &["alice-new", "stranger"],
            RecoverAccountOperation {
                account_to_recover: "alice".into(),
                new_owner_authority: key_authority("alice-new"),
                recent_owner_authority: key_authority("stranger"),
            },
        )
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::RecoveryRule(_)));

    chain.push(
        &["alice-new", "alice"],
        RecoverAccountOperation {
            account_to_recover: "alice".into(),
            new_owner_authority: key_authority("alice-new"),
            recent_owner_authority: key_authority("alice"),
        },
    )?;
    chain.generate_block()?;
    assert_eq!(owner_of(&chain, "alice")?, key_authority("alice-new"));
    Ok(())
}

#[test]
fn test_recovery_request_expires() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 10 * COIN)?;
    update_owner(&mut chain, "alice", "mallory")?;
    chain.push(
        &["genesis"],
        RequestAccountRecoveryOperation {
            recovery_account: genesis(),
            account_to_recover: "alice".into(),
            new_owner_authority: key_authority("alice-new"),
        },
    )?;
    chain.generate_block()?;

    let expires = chain.now() - 3 + SECONDS_PER_DAY;
    chain.generate_block_at(expires)?;
    let err = chain
        .push(
            &["alice-new", "alice"],
            RecoverAccountOperation {
                account_to_recover: "alice".into(),
                new_owner_authority: key_authority("alice-new"),
                recent_owner_authority: key_authority("alice"),
            },
        )
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::RecoveryRule(_)));
    assert_eq!(owner_of(&chain, "alice")?, key_authority("mallory"));
    Ok(())
}

#[test]
fn test_recovery_partner_change_is_delayed() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;

    chain.push(
        &["alice"],
        ChangeRecoveryAccountOperation {
            account_to_recover: "alice".into(),
            new_recovery_account: "bob".into(),
        },
    )?;
    chain.generate_block()?;
    assert_eq!(chain.db.get_account(&"alice".into())?.recovery_account, genesis());

    let effective_on = chain.now() - 3 + OWNER_AUTH_RECOVERY_PERIOD;
    chain.generate_block_at(effective_on)?;
    assert_eq!(
        chain.db.get_account(&"alice".into())?.recovery_account.as_str(),
        "bob"
    );
    Ok(())
}

#[test]
fn test_inactive_account_is_reset() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice", "bob"], 10 * COIN)?;

    chain.push(
        &["alice"],
        SetResetAccountOperation {
            account: "alice".into(),
            current_reset_account: genesis(),
            reset_account: "bob".into(),
            days: 7,
        },
    )?;
    chain.generate_block()?;
    let last_activity = chain.db.get_account(&"alice".into())?.last_activity;

    let reset = ResetAccountOperation {
        reset_account: "bob".into(),
        account_to_reset: "alice".into(),
        new_owner_authority: key_authority("alice-reset"),
    };
    let err = chain.push(&["bob"], reset.clone()).unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AccountRule(_)));

    chain.generate_block_at(last_activity + 7 * SECONDS_PER_DAY)?;
    chain.push(&["bob"], reset)?;
    assert_eq!(owner_of(&chain, "alice")?, key_authority("alice-reset"));
    Ok(())
}

fn membership(tier: MembershipTier, months: u16, recurring: bool) -> AccountMembershipOperation {
    AccountMembershipOperation {
        account: "alice".into(),
        membership: tier,
        months,
        recurring,
    }
}

#[test]
fn test_membership_upgrade_renewal_and_lapse() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 200 * COIN)?;
    let symbol = coin(0).symbol;

    let err = chain
        .push(&["alice"], membership(MembershipTier::None, 0, false))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::AccountRule(_)));

    let fund = chain.db.get_reward_fund(&symbol)?.content_reward_balance;
    let bought = chain.now();
    chain.push(&["alice"], membership(MembershipTier::Mid, 1, true))?;
    assert_eq!(chain.liquid("alice"), 200 * COIN - MEMBERSHIP_FEE_MID);
    assert_eq!(
        chain.db.get_reward_fund(&symbol)?.content_reward_balance,
        fund + MEMBERSHIP_FEE_MID
    );

    // Upgrading in the same block credits the whole unused month
    chain.push(&["alice"], membership(MembershipTier::Top, 1, true))?;
    assert_eq!(chain.liquid("alice"), 200 * COIN - MEMBERSHIP_FEE_TOP);
    chain.generate_block()?;
    let account = chain.db.get_account(&"alice".into())?;
    assert_eq!(account.membership, MembershipTier::Top);
    assert_eq!(account.membership_expiration, bought + MEMBERSHIP_PERIOD);
    assert!(account.recurring_membership);

    // Renewed once from the liquid balance, then dropped when it runs dry
    chain.generate_block_at(bought + MEMBERSHIP_PERIOD)?;
    let account = chain.db.get_account(&"alice".into())?;
    assert_eq!(account.membership, MembershipTier::Top);
    assert_eq!(account.membership_expiration, bought + 2 * MEMBERSHIP_PERIOD);
    assert_eq!(chain.liquid("alice"), 200 * COIN - 2 * MEMBERSHIP_FEE_TOP);

    chain.generate_block_at(bought + 2 * MEMBERSHIP_PERIOD)?;
    let account = chain.db.get_account(&"alice".into())?;
    assert_eq!(account.membership, MembershipTier::None);
    assert_eq!(account.membership_expiration, TIME_MAX);
    assert!(!account.recurring_membership);
    assert_eq!(chain.liquid("alice"), 200 * COIN - 2 * MEMBERSHIP_FEE_TOP);
    chain.db.validate_invariants()?;
    Ok(())
}

#[test]
fn test_membership_cancel_and_unaffordable_purchase() -> Result<(), Box<dyn Error>> {
    let mut chain = TestChain::new();
    chain.create_funded_accounts(&["alice"], 10 * COIN)?;

    let err = chain
        .push(&["alice"], membership(MembershipTier::Top, 1, false))
        .unwrap_err();
    assert!(matches!(err.root(), BlockchainError::InsufficientFunds { .. }));

    chain.push(&["alice"], membership(MembershipTier::Standard, 2, false))?;
    chain.generate_block()?;
    assert_eq!(
        chain.db.get_account(&"alice".into())?.membership,
        MembershipTier::Standard
    );

    chain.push(&["alice"], membership(MembershipTier::None, 0, false))?;
    chain.generate_block()?;
    let account = chain.db.get_account(&"alice".into())?;
    assert_eq!(account.membership, MembershipTier::None);
    assert_eq!(account.membership_expiration, TIME_MAX);
    // Cancelling refunds nothing
    assert_eq!(chain.liquid("alice"), 0);
    Ok(())
}
