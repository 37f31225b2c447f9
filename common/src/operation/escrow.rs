use super::{
    validate_account_name, validate_json, validate_length, validate_non_negative,
    validate_percent, validate_positive, OperationType,
};
use crate::{
    account::AccountName,
    asset::{Asset, Symbol},
    authority::{AuthorityLevel, RequiredAuthorities},
    config::{MAX_MEMO_SIZE, MAX_STRING_SIZE, MAX_URL_SIZE},
    error::ValidationError,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

fn validate_escrow_id(escrow_id: &str) -> Result<(), ValidationError> {
    if escrow_id.is_empty() {
        return Err(ValidationError::Empty("escrow_id"));
    }
    validate_length("escrow_id", escrow_id, MAX_STRING_SIZE)
}

/// Propose an escrow payment from `from` to `to`.
///
/// Either party may propose. Nothing is deposited until the parties approve,
/// and the proposal can be edited while no one has approved it yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransferOperation {
    pub account: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub escrow_id: String,
    pub amount: Asset,
    pub acceptance_time: TimestampSeconds,
    pub escrow_expiration: TimestampSeconds,
    pub memo: String,
    pub json: String,
}

impl_serializer!(EscrowTransferOperation {
    account,
    from,
    to,
    escrow_id,
    amount,
    acceptance_time,
    escrow_expiration,
    memo,
    json
});

impl OperationType for EscrowTransferOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        if self.from == self.to {
            return Err(ValidationError::SelfReference(self.from.clone()));
        }
        if self.account != self.from && self.account != self.to {
            return Err(ValidationError::InvalidParameters(
                "escrow must be proposed by one of its parties",
            ));
        }
        validate_escrow_id(&self.escrow_id)?;
        validate_positive(&self.amount)?;
        if self.acceptance_time >= self.escrow_expiration {
            return Err(ValidationError::InvalidTime(
                "acceptance time must be before escrow expiration",
            ));
        }
        validate_length("memo", &self.memo, MAX_MEMO_SIZE)?;
        validate_json("json", &self.json)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Approve an escrow and deposit the bond, or reject it.
///
/// `from` and `to` nominate their mediator when approving. Rejecting before
/// full approval cancels the escrow and refunds every deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowApproveOperation {
    pub account: AccountName,
    pub mediator: AccountName,
    pub escrow_from: AccountName,
    pub escrow_id: String,
    pub approved: bool,
}

impl_serializer!(EscrowApproveOperation {
    account,
    mediator,
    escrow_from,
    escrow_id,
    approved
});

impl OperationType for EscrowApproveOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_account_name(&self.escrow_from)?;
        if !self.mediator.is_empty() {
            validate_account_name(&self.mediator)?;
        }
        validate_escrow_id(&self.escrow_id)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Raise a dispute on a fully approved escrow before it expires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowDisputeOperation {
    pub account: AccountName,
    pub escrow_from: AccountName,
    pub escrow_id: String,
}

impl_serializer!(EscrowDisputeOperation {
    account,
    escrow_from,
    escrow_id
});

impl OperationType for EscrowDisputeOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_account_name(&self.escrow_from)?;
        validate_escrow_id(&self.escrow_id)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Release escrow funds, or vote on the release share while disputed.
///
/// `release_percent` is the share of the payment going to `to`, the rest is
/// refunded to `from`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReleaseOperation {
    pub account: AccountName,
    pub escrow_from: AccountName,
    pub escrow_id: String,
    pub release_percent: u16,
}

impl_serializer!(EscrowReleaseOperation {
    account,
    escrow_from,
    escrow_id,
    release_percent
});

impl OperationType for EscrowReleaseOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_account_name(&self.escrow_from)?;
        validate_escrow_id(&self.escrow_id)?;
        validate_percent(self.release_percent)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Register, update or deactivate an escrow mediator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMediatorOperation {
    pub account: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    pub mediator_bond: Asset,
    pub active: bool,
}

impl_serializer!(UpdateMediatorOperation {
    account,
    details,
    url,
    json,
    mediator_bond,
    active
});

impl OperationType for UpdateMediatorOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_length("details", &self.details, MAX_MEMO_SIZE)?;
        validate_length("url", &self.url, MAX_URL_SIZE)?;
        validate_json("json", &self.json)?;
        validate_non_negative(&self.mediator_bond)?;
        if self.mediator_bond.symbol != Symbol::coin() {
            return Err(ValidationError::SymbolMismatch {
                expected: Symbol::coin(),
                found: self.mediator_bond.symbol.clone(),
            });
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

    fn transfer() -> EscrowTransferOperation {
        EscrowTransferOperation {
            account: "alice".into(),
            from: "alice".into(),
            to: "bob".into(),
            escrow_id: "6c3a5b1e-escrow".into(),
            amount: Asset::coin(1_000),
            acceptance_time: 100,
            escrow_expiration: 200,
            memo: String::new(),
            json: String::new(),
        }
    }

    #[test]
    fn test_escrow_transfer_validate() {
        assert!(transfer().validate().is_ok());

        let mut op = transfer();
        op.account = "carol".into();
        assert!(op.validate().is_err());

        let mut op = transfer();
        op.acceptance_time = 200;
        assert!(matches!(op.validate(), Err(ValidationError::InvalidTime(_))));

        let mut op = transfer();
        op.to = "alice".into();
        assert!(matches!(op.validate(), Err(ValidationError::SelfReference(_))));
    }

    #[test]
    fn test_release_percent_bounds() {
        let mut op = EscrowReleaseOperation {
            account: "bob".into(),
            escrow_from: "alice".into(),
            escrow_id: "e1x".into(),
            release_percent: 10_000,
        };
        assert!(op.validate().is_ok());
        op.release_percent = 10_001;
        assert_eq!(op.validate(), Err(ValidationError::InvalidPercent(10_001)));
    }
}
