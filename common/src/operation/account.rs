use super::{validate_account_name, validate_json, validate_non_negative, OperationType};
use crate::{
    account::{AccountName, MembershipTier},
    asset::{Asset, Symbol},
    authority::{Authority, AuthorityLevel, RequiredAuthorities},
    config::{MAX_MEMBERSHIP_MONTHS, MAX_RESET_ACCOUNT_DELAY_DAYS, MIN_RESET_ACCOUNT_DELAY_DAYS},
    crypto::PublicKey,
    error::ValidationError,
};
use serde::{Deserialize, Serialize};

/// Create a new account, paying the fee into its stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
    pub fee: Asset,
}

impl_serializer!(AccountCreateOperation {
    creator,
    new_account_name,
    owner,
    active,
    posting,
    memo_key,
    json_metadata,
    fee
});

impl OperationType for AccountCreateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.creator)?;
        validate_account_name(&self.new_account_name)?;
        validate_non_negative(&self.fee)?;
        if self.fee.symbol != Symbol::coin() {
            return Err(ValidationError::SymbolMismatch {
                expected: Symbol::coin(),
                found: self.fee.symbol.clone(),
            });
        }
        self.owner.validate()?;
        self.active.validate()?;
        self.posting.validate()?;
        validate_json("json_metadata", &self.json_metadata)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.creator, AuthorityLevel::Active);
    }
}

/// Replace some of the authorities or metadata of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: AccountName,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub posting: Option<Authority>,
    pub memo_key: Option<PublicKey>,
    pub json_metadata: String,
}

impl_serializer!(AccountUpdateOperation {
    account,
    owner,
    active,
    posting,
    memo_key,
    json_metadata
});

impl OperationType for AccountUpdateOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        for authority in [&self.owner, &self.active, &self.posting].into_iter().flatten() {
            authority.validate()?;
        }
        validate_json("json_metadata", &self.json_metadata)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        let level = if self.owner.is_some() {
            AuthorityLevel::Owner
        } else {
            AuthorityLevel::Active
        };
        required.require(&self.account, level);
    }
}

/// Delegate voting power to another account, or back to self with an empty proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateProxyOperation {
    pub account: AccountName,
    pub proxy: AccountName,
}

impl_serializer!(AccountUpdateProxyOperation { account, proxy });

impl OperationType for AccountUpdateProxyOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        if !self.proxy.is_proxy_to_self() {
            validate_account_name(&self.proxy)?;
        }
        if self.proxy == self.account {
            return Err(ValidationError::SelfReference(self.account.clone()));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Recovery partner proposes a new owner authority for an account.
///
/// A zero threshold authority cancels the pending request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

impl_serializer!(RequestAccountRecoveryOperation {
    recovery_account,
    account_to_recover,
    new_owner_authority
});

impl RequestAccountRecoveryOperation {
    pub fn is_cancel(&self) -> bool {
        self.new_owner_authority.weight_threshold == 0
    }
}

impl OperationType for RequestAccountRecoveryOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.recovery_account)?;
        validate_account_name(&self.account_to_recover)?;
        if !self.is_cancel() {
            self.new_owner_authority.validate()?;
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.recovery_account, AuthorityLevel::Active);
    }
}

/// Account proves a recent owner authority and accepts the requested new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

impl_serializer!(RecoverAccountOperation {
    account_to_recover,
    new_owner_authority,
    recent_owner_authority
});

impl OperationType for RecoverAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account_to_recover)?;
        if self.new_owner_authority == self.recent_owner_authority {
            return Err(ValidationError::InvalidParameters(
                "new owner authority must differ from the recent one",
            ));
        }
        self.new_owner_authority.validate()?;
        self.recent_owner_authority.validate()
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.other.push(self.new_owner_authority.clone());
        required.other.push(self.recent_owner_authority.clone());
    }
}

/// Change the recovery partner, effective after the owner recovery period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl_serializer!(ChangeRecoveryAccountOperation {
    account_to_recover,
    new_recovery_account
});

impl OperationType for ChangeRecoveryAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account_to_recover)?;
        validate_account_name(&self.new_recovery_account)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account_to_recover, AuthorityLevel::Owner);
    }
}

/// Nominate the account able to reset the owner after a period of inactivity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResetAccountOperation {
    pub account: AccountName,
    pub current_reset_account: AccountName,
    pub reset_account: AccountName,
    pub days: u16,
}

impl_serializer!(SetResetAccountOperation {
    account,
    current_reset_account,
    reset_account,
    days
});

impl OperationType for SetResetAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_account_name(&self.reset_account)?;
        if !self.current_reset_account.is_empty() {
            validate_account_name(&self.current_reset_account)?;
        }
        if self.reset_account == self.account {
            return Err(ValidationError::SelfReference(self.account.clone()));
        }
        if self.current_reset_account == self.reset_account {
            return Err(ValidationError::InvalidParameters(
                "new reset account must differ from the current one",
            ));
        }
        if !(MIN_RESET_ACCOUNT_DELAY_DAYS..=MAX_RESET_ACCOUNT_DELAY_DAYS).contains(&self.days) {
            return Err(ValidationError::InvalidParameters("reset delay out of range"));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Owner);
    }
}

/// Reset account replaces the owner authority of an inactive account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAccountOperation {
    pub reset_account: AccountName,
    pub account_to_reset: AccountName,
    pub new_owner_authority: Authority,
}

impl_serializer!(ResetAccountOperation {
    reset_account,
    account_to_reset,
    new_owner_authority
});

impl OperationType for ResetAccountOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.reset_account)?;
        validate_account_name(&self.account_to_reset)?;
        self.new_owner_authority.validate()
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.reset_account, AuthorityLevel::Active);
    }
}

/// Buy, upgrade or cancel a paid membership.
///
/// Tier `None` cancels the current membership and takes no months.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMembershipOperation {
    pub account: AccountName,
    pub membership: MembershipTier,
    pub months: u16,
    pub recurring: bool,
}

impl_serializer!(AccountMembershipOperation {
    account,
    membership,
    months,
    recurring
});

impl OperationType for AccountMembershipOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        let valid_months = match self.membership {
            MembershipTier::None => self.months == 0 && !self.recurring,
            _ => (1..=MAX_MEMBERSHIP_MONTHS).contains(&self.months),
        };
        if !valid_months {
            return Err(ValidationError::InvalidParameters("invalid membership duration"));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn key_authority(seed: &str) -> Authority {
        Authority::from_key(KeyPair::from_seed(seed).public_key())
    }

    fn create_op() -> AccountCreateOperation {
        AccountCreateOperation {
            creator: "genesis".into(),
            new_account_name: "alice".into(),
            owner: key_authority("alice_owner"),
            active: key_authority("alice_active"),
            posting: key_authority("alice_posting"),
            memo_key: KeyPair::from_seed("alice_memo").public_key(),
            json_metadata: String::new(),
            fee: Asset::coin(100_000_000),
        }
    }

    #[test]
    fn test_account_create_validate() {
        assert!(create_op().validate().is_ok());

        let mut op = create_op();
        op.new_account_name = "Al".into();
        assert!(matches!(op.validate(), Err(ValidationError::InvalidAccountName(_))));

        let mut op = create_op();
        op.fee = Asset::new(10, Symbol::usd());
        assert!(matches!(op.validate(), Err(ValidationError::SymbolMismatch { .. })));

        let mut op = create_op();
        op.owner = Authority::new(1);
        assert_eq!(op.validate(), Err(ValidationError::ImpossibleAuthority));
    }

    #[test]
    fn test_update_owner_requires_owner() {
        let mut op = AccountUpdateOperation {
            account: "alice".into(),
            owner: None,
            active: Some(key_authority("new_active")),
            posting: None,
            memo_key: None,
            json_metadata: String::new(),
        };
        let mut required = RequiredAuthorities::new();
        op.required_authorities(&mut required);
        assert!(required.active.contains("alice"));

        op.owner = Some(key_authority("new_owner"));
        let mut required = RequiredAuthorities::new();
        op.required_authorities(&mut required);
        assert!(required.owner.contains("alice"));
        assert!(required.active.is_empty());
    }

    #[test]
    fn test_membership_months_bounds() {
        let mut op = AccountMembershipOperation {
            account: "alice".into(),
            membership: MembershipTier::Mid,
            months: 1,
            recurring: true,
        };
        assert!(op.validate().is_ok());
        op.months = 0;
        assert!(op.validate().is_err());
        op.months = MAX_MEMBERSHIP_MONTHS + 1;
        assert!(op.validate().is_err());

        op.membership = MembershipTier::None;
        op.months = 0;
        op.recurring = false;
        assert!(op.validate().is_ok());
        op.months = 3;
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_proxy_to_self_allowed() {
        let op = AccountUpdateProxyOperation {
            account: "alice".into(),
            proxy: AccountName::proxy_to_self(),
        };
        assert!(op.validate().is_ok());

        let op = AccountUpdateProxyOperation {
            account: "alice".into(),
            proxy: "alice".into(),
        };
        assert!(matches!(op.validate(), Err(ValidationError::SelfReference(_))));
    }

    #[test]
    fn test_recovery_request_cancel() {
        let op = RequestAccountRecoveryOperation {
            recovery_account: "genesis".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: Authority::new(0),
        };
        assert!(op.is_cancel());
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_recover_account_requires_both_authorities() {
        let op = RecoverAccountOperation {
            account_to_recover: "alice".into(),
            new_owner_authority: key_authority("new"),
            recent_owner_authority: key_authority("old"),
        };
        assert!(op.validate().is_ok());
        let mut required = RequiredAuthorities::new();
        op.required_authorities(&mut required);
        assert_eq!(required.other.len(), 2);
        assert!(required.accounts().is_empty());
    }

    #[test]
    fn test_set_reset_account_days() {
        let mut op = SetResetAccountOperation {
            account: "alice".into(),
            current_reset_account: "genesis".into(),
            reset_account: "bob".into(),
            days: 2,
        };
        assert!(op.validate().is_err());
        op.days = 7;
        assert!(op.validate().is_ok());
    }
}
