// Ezira ledger daemon library
// Exposes the chain database for the daemon binary and the integration tests

#![allow(clippy::type_complexity)]
#![allow(clippy::uninlined_format_args)]

extern crate log;

pub mod config;
pub mod core;
