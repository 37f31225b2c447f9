use super::{
    validate_account_name, validate_length, validate_non_negative, validate_percent,
    validate_positive, OperationType,
};
use crate::{
    account::AccountName,
    asset::Asset,
    authority::{AuthorityLevel, RequiredAuthorities},
    config::{MAX_MEMO_SIZE, MAX_STRING_SIZE, MIN_RECURRING_TRANSFER_INTERVAL},
    error::ValidationError,
    time::{DurationSeconds, TimestampSeconds},
};
use serde::{Deserialize, Serialize};

/// Move liquid funds between two accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl_serializer!(TransferOperation {
    from,
    to,
    amount,
    memo
});

impl OperationType for TransferOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        validate_positive(&self.amount)?;
        validate_length("memo", &self.memo, MAX_MEMO_SIZE)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}

/// Move liquid funds into the savings balance of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToSavingsOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl_serializer!(TransferToSavingsOperation {
    from,
    to,
    amount,
    memo
});

impl OperationType for TransferToSavingsOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        validate_positive(&self.amount)?;
        validate_length("memo", &self.memo, MAX_MEMO_SIZE)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}

/// Start, edit or cancel a delayed withdrawal from savings.
///
/// `transferred = false` cancels the request with the same `request_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFromSavingsOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub request_id: String,
    pub memo: String,
    pub transferred: bool,
}

impl_serializer!(TransferFromSavingsOperation {
    from,
    to,
    amount,
    request_id,
    memo,
    transferred
});

impl OperationType for TransferFromSavingsOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        if self.request_id.is_empty() {
            return Err(ValidationError::Empty("request_id"));
        }
        validate_length("request_id", &self.request_id, MAX_STRING_SIZE)?;
        validate_length("memo", &self.memo, MAX_MEMO_SIZE)?;
        if self.transferred {
            validate_positive(&self.amount)
        } else {
            validate_non_negative(&self.amount)
        }
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}

/// Stake liquid funds, immediately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAssetOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl_serializer!(StakeAssetOperation { from, to, amount });

impl OperationType for StakeAssetOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        validate_positive(&self.amount)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}

/// Schedule staked funds to be paid out over the asset's unstake intervals.
///
/// A zero amount cancels the running unstake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeAssetOperation {
    pub account: AccountName,
    pub amount: Asset,
}

impl_serializer!(UnstakeAssetOperation { account, amount });

impl OperationType for UnstakeAssetOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_non_negative(&self.amount)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Active);
    }
}

/// Route a share of every unstake payment to another account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeAssetRouteOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub percent: u16,
    pub auto_stake: bool,
}

impl_serializer!(UnstakeAssetRouteOperation {
    from,
    to,
    percent,
    auto_stake
});

impl OperationType for UnstakeAssetRouteOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        validate_percent(self.percent)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}

/// Move earned rewards into the liquid balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRewardBalanceOperation {
    pub account: AccountName,
    pub reward: Asset,
}

impl_serializer!(ClaimRewardBalanceOperation { account, reward });

impl OperationType for ClaimRewardBalanceOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.account)?;
        validate_positive(&self.reward)
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.account, AuthorityLevel::Posting);
    }
}

/// Create, update or cancel a transfer paid every `interval` seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecurringOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub transfer_id: String,
    pub begin: TimestampSeconds,
    pub payments: u32,
    pub interval: DurationSeconds,
    pub memo: String,
    pub extensible: bool,
    pub fill_or_kill: bool,
    pub active: bool,
}

impl_serializer!(TransferRecurringOperation {
    from,
    to,
    amount,
    transfer_id,
    begin,
    payments,
    interval,
    memo,
    extensible,
    fill_or_kill,
    active
});

impl TransferRecurringOperation {
    /// Time of the last scheduled payment.
    pub fn end(&self) -> Option<TimestampSeconds> {
        let remaining = (self.payments as u64).checked_sub(1)?;
        self.begin.checked_add(self.interval.checked_mul(remaining)?)
    }
}

impl OperationType for TransferRecurringOperation {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.from)?;
        validate_account_name(&self.to)?;
        if self.from == self.to {
            return Err(ValidationError::SelfReference(self.from.clone()));
        }
        if self.transfer_id.is_empty() {
            return Err(ValidationError::Empty("transfer_id"));
        }
        validate_length("transfer_id", &self.transfer_id, MAX_STRING_SIZE)?;
        validate_length("memo", &self.memo, MAX_MEMO_SIZE)?;

        // Cancellation only needs the transfer id
        if !self.active {
            return Ok(());
        }

        validate_positive(&self.amount)?;
        if self.extensible && self.fill_or_kill {
            return Err(ValidationError::InvalidParameters(
                "transfer cannot be both extensible and fill or kill",
            ));
        }
        if self.interval < MIN_RECURRING_TRANSFER_INTERVAL {
            return Err(ValidationError::InvalidTime("interval is shorter than one hour"));
        }
        if self.payments == 0 {
            return Err(ValidationError::InvalidParameters("at least one payment is required"));
        }
        if self.end().is_none() {
            return Err(ValidationError::InvalidTime("schedule end overflows"));
        }
        Ok(())
    }

    fn required_authorities(&self, required: &mut RequiredAuthorities) {
        required.require(&self.from, AuthorityLevel::Active);
    }
}
