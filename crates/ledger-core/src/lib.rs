//! # ledger-core
//!
//! Shared plumbing for tokenledger.
//!
//! This crate provides:
//! - [`LedgerError`] - Error type for configuration, I/O and setup failures
//! - [`logging`] - Tracing setup (stderr + rolling JSON file)
//! - [`paths`] - Home directory resolution and `~` expansion

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{LedgerError, Result};
pub use logging::{LogGuard, init_logging};
