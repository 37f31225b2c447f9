use super::{objects::BalanceKind, store::StoreError};
use ezira_common::{
    account::AccountName,
    asset::{Asset, Symbol},
    block::BlockNumber,
    crypto::Hash,
    error::{AuthorityError, ValidationError},
    serializer::ReaderError,
    time::TimestampSeconds,
};
use thiserror::Error;

/// Coarse classification of a chain error, as reported to submitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Malformed operation or transaction, no state was read
    Validation,
    // Signatures do not match the required authorities
    Authority,
    // Rejected against the current chain state, the state is unchanged
    BusinessRule,
    // The store can no longer be trusted
    Fatal,
}

#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("Invalid encoding: {0}")]
    Reader(#[from] ReaderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation {index} ({name}) failed: {source}")]
    Operation {
        index: usize,
        name: &'static str,
        source: Box<BlockchainError>,
    },

    // Business rules
    #[error("Unknown account {0}")]
    UnknownAccount(AccountName),

    #[error("Account {0} already exists")]
    AccountExists(AccountName),

    #[error("Unknown asset {0}")]
    UnknownAsset(Symbol),

    #[error("Asset {0} already exists")]
    AssetExists(Symbol),

    #[error("Unknown comment {author}/{permlink}")]
    UnknownComment {
        author: AccountName,
        permlink: String,
    },

    #[error("Unknown escrow {escrow_id} from {from}")]
    UnknownEscrow { from: AccountName, escrow_id: String },

    #[error("Escrow {escrow_id} from {from} already exists")]
    EscrowExists { from: AccountName, escrow_id: String },

    #[error("Account {0} is not an active mediator")]
    UnknownMediator(AccountName),

    #[error("Unknown recurring transfer {transfer_id} from {from}")]
    UnknownRecurringTransfer {
        from: AccountName,
        transfer_id: String,
    },

    #[error("Unknown savings withdrawal {request_id} from {from}")]
    UnknownSavingsWithdraw {
        from: AccountName,
        request_id: String,
    },

    #[error("Unknown order {order_id} of {owner}")]
    UnknownOrder { owner: AccountName, order_id: u32 },

    #[error("Order {order_id} of {owner} already exists")]
    OrderExists { owner: AccountName, order_id: u32 },

    #[error("Unknown block producer {0}")]
    UnknownProducer(AccountName),

    #[error("Insufficient {kind} funds of {account}: {available} available, {needed} needed")]
    InsufficientFunds {
        account: AccountName,
        kind: BalanceKind,
        available: Asset,
        needed: Asset,
    },

    #[error("Supply of {symbol} would exceed its maximum of {max}")]
    SupplyExceeded { symbol: Symbol, max: i64 },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Escrow rule violated: {0}")]
    EscrowRule(&'static str),

    #[error("Recovery rule violated: {0}")]
    RecoveryRule(&'static str),

    #[error("Content rule violated: {0}")]
    ContentRule(&'static str),

    #[error("Account rule violated: {0}")]
    AccountRule(&'static str),

    #[error("Market rule violated: {0}")]
    MarketRule(&'static str),

    #[error("Transfer rule violated: {0}")]
    TransferRule(&'static str),

    #[error("Limit of {limit} {what} reached")]
    LimitReached { what: &'static str, limit: usize },

    #[error("Owner authority of {account} can only be updated after {next}")]
    OwnerUpdateTooSoon {
        account: AccountName,
        next: TimestampSeconds,
    },

    // Transactions
    #[error("Transaction expired at {expiration}, head time is {now}")]
    TransactionExpired {
        expiration: TimestampSeconds,
        now: TimestampSeconds,
    },

    #[error("Transaction expiration {expiration} is too far after {now}")]
    ExpirationTooFar {
        expiration: TimestampSeconds,
        now: TimestampSeconds,
    },

    #[error("Transaction references an unknown or stale block")]
    InvalidReferenceBlock,

    #[error("Duplicate transaction {0}")]
    DuplicateTransaction(Hash),

    // Blocks
    #[error("Block {id} does not link to a known block")]
    UnlinkableBlock { id: Hash },

    #[error("Invalid block timestamp {timestamp}, head time is {head_time}")]
    InvalidBlockTimestamp {
        timestamp: TimestampSeconds,
        head_time: TimestampSeconds,
    },

    #[error("Block producer {0} is not an active producer")]
    UnknownBlockProducer(AccountName),

    #[error("Invalid producer signature on block {0}")]
    InvalidProducerSignature(Hash),

    #[error("Invalid merkle root on block {0}")]
    InvalidMerkleRoot(Hash),

    #[error("Block size {size} exceeds the maximum of {max}")]
    BlockTooLarge { size: usize, max: usize },

    #[error("Block {num} does not follow the head block {head}")]
    InvalidBlockNumber { num: BlockNumber, head: BlockNumber },

    #[error("No block to pop")]
    NoBlockToPop,

    #[error("Block {0} is irreversible and cannot be undone")]
    NoUndoHistory(BlockNumber),

    // Fatal
    #[error("Database is halted after a fatal error")]
    Halted,

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Block log is corrupted: {0}")]
    CorruptedBlockLog(String),

    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl BlockchainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::Store(e) if e.is_fatal() => ErrorKind::Fatal,
            BlockchainError::Store(_) => ErrorKind::BusinessRule,
            BlockchainError::Validation(_) | BlockchainError::Reader(_) => ErrorKind::Validation,
            BlockchainError::Authority(_) => ErrorKind::Authority,
            BlockchainError::Operation { source, .. } => source.kind(),
            BlockchainError::Io(_)
            | BlockchainError::Halted
            | BlockchainError::InvariantViolation(_)
            | BlockchainError::CorruptedBlockLog(_) => ErrorKind::Fatal,
            _ => ErrorKind::BusinessRule,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// Index of the failing operation within its transaction.
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            BlockchainError::Operation { index, .. } => Some(*index),
            BlockchainError::Validation(ValidationError::Operation { index, .. }) => Some(*index),
            _ => None,
        }
    }

    /// Innermost error, without the operation context.
    pub fn root(&self) -> &BlockchainError {
        match self {
            BlockchainError::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_source() {
        let err = BlockchainError::Operation {
            index: 2,
            name: "transfer",
            source: Box::new(BlockchainError::UnknownAccount("ghost".into())),
        };
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(err.operation_index(), Some(2));
        assert!(matches!(err.root(), BlockchainError::UnknownAccount(_)));

        let fatal: BlockchainError = StoreError::OutOfMemory {
            needed: 2,
            capacity: 1,
        }
        .into();
        assert!(fatal.is_fatal());

        let missing: BlockchainError = StoreError::NoActiveSession.into();
        assert_eq!(missing.kind(), ErrorKind::BusinessRule);
    }

    #[test]
    fn test_validation_index() {
        let err: BlockchainError = ValidationError::Operation {
            index: 1,
            source: Box::new(ValidationError::EmptyTransaction),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.operation_index(), Some(1));
    }
}
