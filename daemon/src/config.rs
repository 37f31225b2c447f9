use clap::Args;
use ezira_common::{
    config::{BLOCKCHAIN_PRECISION, MAX_ASSET_SUPPLY, PERCENT_1},
    static_assert,
    time::TimestampSeconds,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{
    env,
    ops::{BitOr, BitOrAssign},
};

// Default directory of the block log
pub const DEFAULT_DATA_DIR: &str = "data/";
pub const BLOCK_LOG_FILENAME: &str = "block_log";

// Capacity of the object store, exceeding it halts the database
pub const DEFAULT_SHARED_MEMORY_SIZE: u64 = 1024 * 1024 * 1024;

// Blocks kept reversible before they are committed and written to the block log
pub const DEFAULT_MAX_UNDO_HISTORY: u32 = 10_000;

// Number of slots of the block summary ring used by TaPoS
pub const BLOCK_SUMMARY_SLOTS: u32 = 0x10000;

// Account created at genesis, first producer and holder of the initial supply
pub const GENESIS_ACCOUNT_NAME: &str = "genesis";
// Seed of the genesis key when no key is configured
pub const GENESIS_KEY_SEED: &str = "ezira-genesis";

// Yearly interest of the genesis credit asset, in basis points
pub const CREDIT_LIQUID_INTEREST_RATE: u16 = 2 * PERCENT_1;
pub const CREDIT_STAKED_INTEREST_RATE: u16 = 5 * PERCENT_1;
pub const CREDIT_SAVINGS_INTEREST_RATE: u16 = 8 * PERCENT_1;

pub const DEFAULT_GENESIS_TIME: TimestampSeconds = 1_700_000_000;
pub const DEFAULT_INIT_SUPPLY: i64 = 1_000_000 * BLOCKCHAIN_PRECISION;
pub const DEFAULT_PRODUCER_REWARD: i64 = BLOCKCHAIN_PRECISION;
pub const DEFAULT_CONTENT_REWARD: i64 = 5 * BLOCKCHAIN_PRECISION;

static_assert!(
    DEFAULT_INIT_SUPPLY <= MAX_ASSET_SUPPLY,
    "Initial supply must fit in the asset supply"
);
static_assert!(
    BLOCK_SUMMARY_SLOTS == u16::MAX as u32 + 1,
    "Block summary ring is indexed by the 16 bits of ref_block_num"
);

lazy_static! {
    // Runtime toggle checking every supply invariant after each block
    // Enable via: export EZIRA_VALIDATE_INVARIANTS=1
    static ref VALIDATE_INVARIANTS_ENABLED: bool = {
        match env::var("EZIRA_VALIDATE_INVARIANTS") {
            Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "True"),
            Err(_) => false,
        }
    };
}

pub fn validate_invariants_enabled() -> bool {
    *VALIDATE_INVARIANTS_ENABLED
}

/// Checks disabled while pushing a block or a transaction.
///
/// Production paths use `SkipFlags::NOTHING`. The other flags exist for
/// replaying trusted blocks and for test scaffolding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SkipFlags(u32);

impl SkipFlags {
    pub const NOTHING: SkipFlags = SkipFlags(0);
    pub const PRODUCER_SIGNATURE: SkipFlags = SkipFlags(1 << 0);
    pub const TRANSACTION_SIGNATURES: SkipFlags = SkipFlags(1 << 1);
    pub const TRANSACTION_DUPE_CHECK: SkipFlags = SkipFlags(1 << 2);
    pub const TAPOS_CHECK: SkipFlags = SkipFlags(1 << 3);
    pub const MERKLE_CHECK: SkipFlags = SkipFlags(1 << 4);
    pub const AUTHORITY_CHECK: SkipFlags = SkipFlags(1 << 5);
    pub const BLOCK_SIZE_CHECK: SkipFlags = SkipFlags(1 << 6);
    pub const UNDO_HISTORY_CHECK: SkipFlags = SkipFlags(1 << 7);

    // Blocks read back from our own block log were fully checked once
    pub const REPLAY: SkipFlags = SkipFlags(
        Self::PRODUCER_SIGNATURE.0
            | Self::TRANSACTION_SIGNATURES.0
            | Self::TRANSACTION_DUPE_CHECK.0
            | Self::TAPOS_CHECK.0
            | Self::MERKLE_CHECK.0
            | Self::AUTHORITY_CHECK.0
            | Self::BLOCK_SIZE_CHECK.0,
    );

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn contains(&self, other: SkipFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: SkipFlags) -> SkipFlags {
        SkipFlags(self.0 & !other.0)
    }
}

impl BitOr for SkipFlags {
    type Output = SkipFlags;

    fn bitor(self, rhs: SkipFlags) -> SkipFlags {
        SkipFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SkipFlags {
    fn bitor_assign(&mut self, rhs: SkipFlags) {
        self.0 |= rhs.0;
    }
}

fn default_data_dir() -> String {
    DEFAULT_DATA_DIR.to_string()
}

fn default_shared_memory_size() -> u64 {
    DEFAULT_SHARED_MEMORY_SIZE
}

fn default_max_undo_history() -> u32 {
    DEFAULT_MAX_UNDO_HISTORY
}

fn default_genesis_time() -> TimestampSeconds {
    DEFAULT_GENESIS_TIME
}

fn default_init_supply() -> i64 {
    DEFAULT_INIT_SUPPLY
}

fn default_producer_reward() -> i64 {
    DEFAULT_PRODUCER_REWARD
}

fn default_content_reward() -> i64 {
    DEFAULT_CONTENT_REWARD
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the block log
    #[clap(long, default_value_t = default_data_dir())]
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Capacity of the object store in bytes
    #[clap(long, default_value_t = default_shared_memory_size())]
    #[serde(default = "default_shared_memory_size")]
    pub shared_memory_size: u64,
    /// Number of reversible blocks kept before they are committed
    #[clap(long, default_value_t = default_max_undo_history())]
    #[serde(default = "default_max_undo_history")]
    pub max_undo_history: u32,
    /// Keep the chain state in memory only, without a block log
    #[clap(long)]
    #[serde(default)]
    pub disable_block_log: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            shared_memory_size: default_shared_memory_size(),
            max_undo_history: default_max_undo_history(),
            disable_block_log: false,
        }
    }
}

impl DatabaseConfig {
    /// In memory database, used by tests and tools.
    pub fn in_memory() -> Self {
        Self {
            disable_block_log: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Timestamp of the genesis state, block slots are aligned on it
    #[clap(long, default_value_t = default_genesis_time())]
    #[serde(default = "default_genesis_time")]
    pub genesis_time: TimestampSeconds,
    /// Hex public key of the genesis account, derived from a fixed seed if unset
    #[clap(long)]
    #[serde(default)]
    pub genesis_key: Option<String>,
    /// Initial COIN supply, held liquid by the genesis account
    #[clap(long, default_value_t = default_init_supply())]
    #[serde(default = "default_init_supply")]
    pub init_supply: i64,
    /// COIN minted to the producer staked balance on every block
    #[clap(long, default_value_t = default_producer_reward())]
    #[serde(default = "default_producer_reward")]
    pub producer_reward: i64,
    /// COIN minted to the content reward fund on every block
    #[clap(long, default_value_t = default_content_reward())]
    #[serde(default = "default_content_reward")]
    pub content_reward: i64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_time: default_genesis_time(),
            genesis_key: None,
            init_supply: default_init_supply(),
            producer_reward: default_producer_reward(),
            content_reward: default_content_reward(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_flags() {
        let flags = SkipFlags::TAPOS_CHECK | SkipFlags::MERKLE_CHECK;
        assert!(flags.contains(SkipFlags::TAPOS_CHECK));
        assert!(!flags.contains(SkipFlags::AUTHORITY_CHECK));
        assert!(SkipFlags::REPLAY.contains(flags));
        assert!(!SkipFlags::REPLAY.contains(SkipFlags::UNDO_HISTORY_CHECK));
        assert!(SkipFlags::NOTHING.contains(SkipFlags::NOTHING));
        assert_eq!(flags.without(SkipFlags::TAPOS_CHECK), SkipFlags::MERKLE_CHECK);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: DatabaseConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_undo_history, DEFAULT_MAX_UNDO_HISTORY);
        assert!(!config.disable_block_log);

        let genesis: GenesisConfig = serde_json::from_str(r#"{"init_supply": 42}"#).unwrap();
        assert_eq!(genesis.init_supply, 42);
        assert_eq!(genesis.producer_reward, DEFAULT_PRODUCER_REWARD);
    }
}
