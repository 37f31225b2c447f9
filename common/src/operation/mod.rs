//! Typed operations carried by transactions.
//!
//! Every operation validates its own fields without reading chain state and
//! declares which account authorities must sign for it. Evaluation against
//! the state lives in the daemon.

mod account;
mod asset;
mod comment;
mod escrow;
mod market;
mod producer;
mod transfer;

pub use account::*;
pub use asset::*;
pub use comment::*;
pub use escrow::*;
pub use market::*;
pub use producer::*;
pub use transfer::*;

use crate::{
    account::AccountName,
    asset::{Asset, Symbol},
    authority::RequiredAuthorities,
    config::PERCENT_100,
    error::ValidationError,
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// Stateless behavior shared by every operation.
pub trait OperationType {
    fn validate(&self) -> Result<(), ValidationError>;

    fn required_authorities(&self, required: &mut RequiredAuthorities);
}

macro_rules! define_operations {
    ($($id:literal => $variant:ident($op:ty)),* $(,)?) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
        #[serde(rename_all = "snake_case")]
        #[strum(serialize_all = "snake_case")]
        pub enum Operation {
            $($variant($op)),*
        }

        impl Operation {
            // Wire id of the operation type
            pub fn id(&self) -> u8 {
                match self {
                    $(Operation::$variant(_) => $id),*
                }
            }

            pub fn name(&self) -> &'static str {
                self.into()
            }

            pub fn validate(&self) -> Result<(), ValidationError> {
                match self {
                    $(Operation::$variant(op) => op.validate()),*
                }
            }

            pub fn required_authorities(&self, required: &mut RequiredAuthorities) {
                match self {
                    $(Operation::$variant(op) => op.required_authorities(required)),*
                }
            }
        }

        $(
            impl From<$op> for Operation {
                fn from(op: $op) -> Self {
                    Operation::$variant(op)
                }
            }
        )*

        impl Serializer for Operation {
            fn write(&self, writer: &mut Writer) {
                writer.write_u8(self.id());
                match self {
                    $(Operation::$variant(op) => op.write(writer)),*
                }
            }

            fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
                Ok(match reader.read_u8()? {
                    $($id => Operation::$variant(<$op>::read(reader)?),)*
                    _ => return Err(ReaderError::InvalidValue),
                })
            }

            fn size(&self) -> usize {
                1 + match self {
                    $(Operation::$variant(op) => op.size()),*
                }
            }
        }
    };
}

define_operations! {
    0 => AccountCreate(AccountCreateOperation),
    1 => AccountUpdate(AccountUpdateOperation),
    2 => AccountUpdateProxy(AccountUpdateProxyOperation),
    3 => RequestAccountRecovery(RequestAccountRecoveryOperation),
    4 => RecoverAccount(RecoverAccountOperation),
    5 => ChangeRecoveryAccount(ChangeRecoveryAccountOperation),
    6 => SetResetAccount(SetResetAccountOperation),
    7 => ResetAccount(ResetAccountOperation),
    8 => Transfer(TransferOperation),
    9 => TransferToSavings(TransferToSavingsOperation),
    10 => TransferFromSavings(TransferFromSavingsOperation),
    11 => StakeAsset(StakeAssetOperation),
    12 => UnstakeAsset(UnstakeAssetOperation),
    13 => UnstakeAssetRoute(UnstakeAssetRouteOperation),
    14 => ClaimRewardBalance(ClaimRewardBalanceOperation),
    15 => TransferRecurring(TransferRecurringOperation),
    16 => EscrowTransfer(EscrowTransferOperation),
    17 => EscrowApprove(EscrowApproveOperation),
    18 => EscrowDispute(EscrowDisputeOperation),
    19 => EscrowRelease(EscrowReleaseOperation),
    20 => UpdateMediator(UpdateMediatorOperation),
    21 => Comment(CommentOperation),
    22 => CommentOptions(CommentOptionsOperation),
    23 => Vote(VoteOperation),
    24 => LimitOrderCreate(LimitOrderCreateOperation),
    25 => LimitOrderCancel(LimitOrderCancelOperation),
    26 => AssetCreate(AssetCreateOperation),
    27 => AssetIssue(AssetIssueOperation),
    28 => ProducerUpdate(ProducerUpdateOperation),
    29 => View(ViewOperation),
    30 => Share(ShareOperation),
    31 => AccountMembership(AccountMembershipOperation),
}

pub(crate) fn validate_account_name(name: &AccountName) -> Result<(), ValidationError> {
    if !name.is_valid() {
        return Err(ValidationError::InvalidAccountName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_symbol(symbol: &Symbol) -> Result<(), ValidationError> {
    if !symbol.is_valid() {
        return Err(ValidationError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_non_negative(asset: &Asset) -> Result<(), ValidationError> {
    validate_symbol(&asset.symbol)?;
    if asset.amount < 0 {
        return Err(ValidationError::NegativeAmount(asset.amount));
    }
    if !asset.is_in_range() {
        return Err(ValidationError::AmountOutOfRange(asset.amount));
    }
    Ok(())
}

pub(crate) fn validate_positive(asset: &Asset) -> Result<(), ValidationError> {
    validate_non_negative(asset)?;
    if asset.amount == 0 {
        return Err(ValidationError::NonPositiveAmount(asset.amount));
    }
    Ok(())
}

pub(crate) fn validate_percent(percent: u16) -> Result<(), ValidationError> {
    if percent > PERCENT_100 {
        return Err(ValidationError::InvalidPercent(percent));
    }
    Ok(())
}

pub(crate) fn validate_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            size: value.len(),
            max,
        });
    }
    Ok(())
}

// Empty strings are accepted, anything else must be a JSON object
pub(crate) fn validate_json(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        _ => Err(ValidationError::InvalidJson(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{asset::Asset, crypto::KeyPair};

    fn transfer() -> Operation {
        TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::coin(1_000),
            memo: "rent".into(),
        }
        .into()
    }

    #[test]
    fn test_operation_name_and_id() {
        let op = transfer();
        assert_eq!(op.name(), "transfer");
        assert_eq!(op.id(), 8);
    }

    #[test]
    fn test_binary_encoding() {
        let op = transfer();
        let bytes = op.to_bytes();
        assert_eq!(bytes.len(), op.size());
        assert_eq!(Operation::from_bytes(&bytes).unwrap(), op);

        let mut unknown = bytes.clone();
        unknown[0] = 200;
        assert_eq!(Operation::from_bytes(&unknown), Err(ReaderError::InvalidValue));
    }

    #[test]
    fn test_json_is_externally_tagged() {
        let op = transfer();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["transfer"]["from"], "alice");
        assert_eq!(json["transfer"]["amount"]["amount"], 1_000);
    }

    #[test]
    fn test_producer_update_encoding() {
        let op: Operation = ProducerUpdateOperation {
            owner: "genesis".into(),
            signing_key: KeyPair::from_seed("producer").public_key(),
            url: "https://ezira.example".into(),
            active: true,
        }
        .into();
        assert!(op.validate().is_ok());
        assert_eq!(Operation::from_bytes(&op.to_bytes()).unwrap(), op);
    }

    #[test]
    fn test_json_validation() {
        assert!(validate_json("json", "").is_ok());
        assert!(validate_json("json", "{\"tags\":[\"a\"]}").is_ok());
        assert_eq!(validate_json("json", "[1]"), Err(ValidationError::InvalidJson("json")));
        assert_eq!(validate_json("json", "{oops"), Err(ValidationError::InvalidJson("json")));
    }
}
