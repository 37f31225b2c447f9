use lazy_static::lazy_static;

use crate::{
    crypto::{hash, Hash},
    time::{DurationSeconds, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_WEEK},
};

pub const VERSION: &str = env!("BUILD_VERSION");

// Chain name, hashed into the chain id every signature commits to
pub const CHAIN_NAME: &str = "ezira";

lazy_static! {
    pub static ref CHAIN_ID: Hash = hash(CHAIN_NAME.as_bytes());
}

// ===== PERCENTAGES =====

// Percentages are expressed in basis points
pub const PERCENT_100: u16 = 10_000;
pub const PERCENT_1: u16 = PERCENT_100 / 100;

// ===== ASSETS =====

// Every asset uses the same fixed point precision: 1 unit = 10^8 minor units
pub const BLOCKCHAIN_PRECISION: i64 = 100_000_000;
pub const BLOCKCHAIN_PRECISION_DIGITS: u8 = 8;

// Core network asset, used for fees, staking and content rewards
pub const SYMBOL_COIN: &str = "MEC";
// Equity asset of the network
pub const SYMBOL_EQUITY: &str = "WYM";
// Stablecoin denominated in USD
pub const SYMBOL_USD: &str = "MUSD";
// Credit asset paying interest to its holders
pub const SYMBOL_CREDIT: &str = "MCR";

pub const MAX_ASSET_SYMBOL_LENGTH: usize = 10;
pub const MIN_ASSET_SYMBOL_LENGTH: usize = 1;

// Upper bound of any single asset amount and of any asset supply
pub const MAX_ASSET_SUPPLY: i64 = 1_000_000_000 * BLOCKCHAIN_PRECISION;

// ===== ACCOUNTS =====

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;

// Proxy value of an account voting with its own stake
pub const PROXY_TO_SELF_ACCOUNT: &str = "";

// Minimum fee to create an account, converted to stake of the new account
pub const MIN_ACCOUNT_CREATION_FEE: i64 = BLOCKCHAIN_PRECISION;

// Levels of account indirection followed when resolving an authority
pub const MAX_SIG_CHECK_DEPTH: u32 = 1;

// Maximum number of key and account entries in an authority
pub const MAX_AUTHORITY_MEMBERSHIP: usize = 40;

// Maximum length of a proxy chain
pub const MAX_PROXY_RECURSION_DEPTH: usize = 4;

// Owner authority can only be updated once per this period
pub const OWNER_UPDATE_LIMIT: DurationSeconds = 60 * SECONDS_PER_MINUTE;

// Previous owner authorities can prove ownership during this period
pub const OWNER_AUTH_RECOVERY_PERIOD: DurationSeconds = 30 * SECONDS_PER_DAY;

// A recovery request must be matched by the account before it expires
pub const ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD: DurationSeconds = SECONDS_PER_DAY;

// Default inactivity delay before a reset account can take over
pub const RESET_ACCOUNT_DELAY_DAYS: u16 = 3;
pub const MIN_RESET_ACCOUNT_DELAY_DAYS: u16 = 3;
pub const MAX_RESET_ACCOUNT_DELAY_DAYS: u16 = 365;

// Monthly membership fees in coin
pub const MEMBERSHIP_FEE_STANDARD: i64 = 5 * BLOCKCHAIN_PRECISION;
pub const MEMBERSHIP_FEE_MID: i64 = 25 * BLOCKCHAIN_PRECISION;
pub const MEMBERSHIP_FEE_TOP: i64 = 100 * BLOCKCHAIN_PRECISION;
pub const MEMBERSHIP_PERIOD: DurationSeconds = 30 * SECONDS_PER_DAY;
pub const MAX_MEMBERSHIP_MONTHS: u16 = 120;

// ===== BALANCES =====

pub const MAX_WITHDRAW_ROUTES: u16 = 10;
pub const SAVINGS_WITHDRAW_TIME: DurationSeconds = 3 * SECONDS_PER_DAY;
pub const SAVINGS_WITHDRAW_REQUEST_LIMIT: u16 = 100;
pub const STAKE_WITHDRAW_INTERVAL: DurationSeconds = SECONDS_PER_WEEK;
pub const COIN_UNSTAKE_INTERVALS: u16 = 4;

// Credit interest accrues and compounds once per this period
pub const INTEREST_COMPOUND_INTERVAL: DurationSeconds = SECONDS_PER_HOUR;

pub const MAX_MEMO_SIZE: usize = 2048;
pub const MAX_STRING_SIZE: usize = 256;
pub const MAX_URL_SIZE: usize = 512;
pub const MAX_BODY_SIZE: usize = 65_536;

// Recurring transfers cannot tick faster than once an hour
pub const MIN_RECURRING_TRANSFER_INTERVAL: DurationSeconds = SECONDS_PER_HOUR;

// ===== ESCROW =====

// Share of the payment every approving party deposits as a bond
pub const ESCROW_BOND_PERCENT: u16 = 10 * PERCENT_1;
// Additional mediators allocated to a disputed escrow
pub const ESCROW_DISPUTE_MEDIATOR_AMOUNT: usize = 5;
// Voting window of a disputed escrow
pub const ESCROW_DISPUTE_DURATION: DurationSeconds = 14 * SECONDS_PER_DAY;

// ===== CONTENT =====

pub const CASHOUT_WINDOW: DurationSeconds = 7 * SECONDS_PER_DAY;
pub const CONTENT_REWARD_DECAY_RATE: DurationSeconds = 30 * SECONDS_PER_DAY;
pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;

// Share of a content reward paid to voters
pub const CURATION_REWARD_PERCENT: u16 = 25 * PERCENT_1;

pub const MAX_COMMENT_BENEFICIARIES: usize = 8;
pub const MAX_COMMENT_DEPTH: u16 = 0xffff;
pub const MAX_PERMLINK_LENGTH: usize = 256;

// Voting mana regenerates fully over this period
pub const VOTE_RECHARGE_TIME: DurationSeconds = 7 * SECONDS_PER_DAY;
// Number of full weight votes per recharge period that keep mana neutral
pub const VOTE_RESERVE_RATE: u64 = 20;
pub const MIN_VOTE_INTERVAL: DurationSeconds = 1;
pub const MAX_VOTE_CHANGES: u8 = 5;

// Viewing and sharing mana regenerate like voting mana
pub const VIEW_RECHARGE_TIME: DurationSeconds = 7 * SECONDS_PER_DAY;
pub const VIEW_RESERVE_RATE: u64 = 100;
pub const MIN_VIEW_INTERVAL: DurationSeconds = 1;
pub const SHARE_RECHARGE_TIME: DurationSeconds = 7 * SECONDS_PER_DAY;
pub const SHARE_RESERVE_RATE: u64 = 5;
pub const MIN_SHARE_INTERVAL: DurationSeconds = 1;

// ===== TRANSACTIONS AND BLOCKS =====

// Blocks are produced in fixed slots of this length
pub const BLOCK_INTERVAL: DurationSeconds = 3;
pub const BLOCKS_PER_HOUR: u64 = SECONDS_PER_HOUR / BLOCK_INTERVAL;
pub const BLOCKS_PER_DAY: u64 = SECONDS_PER_DAY / BLOCK_INTERVAL;

// Credit interest is processed on block numbers multiple of this value
pub const CREDIT_INTERVAL_BLOCKS: u64 = INTEREST_COMPOUND_INTERVAL / BLOCK_INTERVAL;

pub const MAX_TIME_UNTIL_EXPIRATION: DurationSeconds = SECONDS_PER_HOUR;
pub const MAX_TRANSACTION_SIZE: usize = 64 * 1024;
pub const MAX_BLOCK_SIZE: usize = MAX_TRANSACTION_SIZE * 100;
pub const MAX_OPERATIONS_PER_TRANSACTION: usize = 256;

// Static checks
static_assert!(
    MAX_TRANSACTION_SIZE <= MAX_BLOCK_SIZE,
    "Max transaction size must be less than or equal to max block size"
);
static_assert!(
    ESCROW_BOND_PERCENT <= PERCENT_100,
    "Escrow bond must not exceed the payment"
);
static_assert!(
    CURATION_REWARD_PERCENT <= PERCENT_100,
    "Curation cannot take more than the whole reward"
);
static_assert!(
    CREDIT_INTERVAL_BLOCKS > 0,
    "Interest interval must span at least one block"
);
static_assert!(
    MIN_ACCOUNT_NAME_LENGTH <= MAX_ACCOUNT_NAME_LENGTH,
    "Account name bounds are inverted"
);
