pub mod block_log;
pub mod database;
pub mod error;
pub mod evaluator;
pub mod fork_db;
pub mod objects;
pub mod store;

pub use database::Database;
pub use error::{BlockchainError, ErrorKind};
