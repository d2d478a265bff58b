//! Bank Core
//!
//! Retail banking ledger: accounts, transfers, debt repayment, loan
//! requests, and the audit log that feeds notifications and statements.
//!
//! # Architecture
//!
//! - **Single Writer**: All mutations are serialized through one actor
//! - **Atomic Commits**: Every multi-record mutation lands in one write batch
//! - **Outcomes over Exceptions**: Domain refusals are values, not errors
//!
//! # Invariants
//!
//! - Money conservation: a transfer debits and credits the same amount
//! - Append-only audit log: entries are never rewritten, only flagged seen
//! - Debt floor: outstanding debt never goes below zero
//! - Failed operations leave no partial state and no log entry

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod access;
pub mod actor;
pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod statement;
pub mod storage;
pub mod types;

// Re-exports
pub use access::{Claims, Ownership};
pub use audit::{LogEntry, LogKind};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{Ledger, Outcome};
pub use statement::{Customer, Profile, StatementLine};
pub use storage::Storage;
pub use types::{Account, AccountNumber, AccountStatus, AccountType, Loan, User};
