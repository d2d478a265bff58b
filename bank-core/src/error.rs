//! Error types for the banking core

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Banking core errors
///
/// These are infrastructure and contract failures. Recoverable business
/// results (insufficient funds, unknown account, non-ownership) are not
/// errors; they are carried by [`crate::Outcome`].
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Malformed operation request (non-positive amount, self-transfer)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller identity could not be resolved (malformed or mis-signed token,
    /// unknown subject). Always fatal for the triggering request.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// An account references a log entry that is missing from the store
    #[error("Dangling log reference: {0}")]
    DanglingLog(uuid::Uuid),

    /// An account references a loan that is missing from the store
    #[error("Dangling loan reference: {0}")]
    DanglingLoan(uuid::Uuid),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Auth(err.to_string())
    }
}
