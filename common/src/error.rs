use crate::{account::AccountName, asset::Symbol};
use thiserror::Error;

/// Stateless validation failure of an operation or transaction.
///
/// Raised before any state is read: bad names, bad amounts, malformed
/// authorities or out of range percentages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid account name: '{0}'")]
    InvalidAccountName(String),

    #[error("Invalid asset symbol: '{0}'")]
    InvalidSymbol(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Amount must not be negative, got {0}")]
    NegativeAmount(i64),

    #[error("Amount {0} exceeds the maximum asset supply")]
    AmountOutOfRange(i64),

    #[error("Asset {found} does not match expected {expected}")]
    SymbolMismatch { expected: Symbol, found: Symbol },

    #[error("Invalid price")]
    InvalidPrice,

    #[error("Percentage {0} exceeds 100%")]
    InvalidPercent(u16),

    #[error("Account {0} cannot target itself")]
    SelfReference(AccountName),

    #[error("Field '{field}' is too long: {size} > {max}")]
    TooLong {
        field: &'static str,
        size: usize,
        max: usize,
    },

    #[error("Field '{0}' must not be empty")]
    Empty(&'static str),

    #[error("Invalid JSON in '{0}'")]
    InvalidJson(&'static str),

    #[error("Authority is impossible to satisfy")]
    ImpossibleAuthority,

    #[error("Authority has too many members: {0}")]
    AuthorityTooLarge(usize),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Entries are not sorted: {0}")]
    NotSorted(&'static str),

    #[error("Transaction has no operations")]
    EmptyTransaction,

    #[error("Transaction has too many operations: {0}")]
    TooManyOperations(usize),

    #[error("Invalid time parameters: {0}")]
    InvalidTime(&'static str),

    #[error("Invalid operation parameters: {0}")]
    InvalidParameters(&'static str),

    #[error("Operation {index} is invalid: {source}")]
    Operation {
        index: usize,
        source: Box<ValidationError>,
    },
}

/// Result of checking signatures against required authorities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("Missing required owner authority of {0}")]
    MissingOwnerAuthority(AccountName),

    #[error("Missing required active authority of {0}")]
    MissingActiveAuthority(AccountName),

    #[error("Missing required posting authority of {0}")]
    MissingPostingAuthority(AccountName),

    #[error("Missing required authority")]
    MissingOtherAuthority,

    #[error("Signature of key {0} is not required by the transaction")]
    IrrelevantSignature(String),

    #[error("Duplicate signature of key {0}")]
    DuplicateSignature(String),

    #[error("Invalid signature of key {0}")]
    InvalidSignature(String),

    #[error("Posting authority cannot be combined with active or owner authority")]
    MixedAuthorityLevels,

    #[error("Unknown account in authority: {0}")]
    UnknownAccount(AccountName),
}
