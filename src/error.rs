//! Error types for Hive
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using HiveError
pub type Result<T> = std::result::Result<T, HiveError>;

/// Unified error type for Hive operations
#[derive(Debug, Error)]
pub enum HiveError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected at line {line}: {reason}")]
    CorruptLog { line: u64, reason: String },

    #[error("WAL is closed")]
    WalClosed,

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    NotFound,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Compaction failed: {0}")]
    Compaction(#[source] Box<HiveError>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HiveError {
    pub(crate) fn corrupt(line: u64, reason: impl Into<String>) -> Self {
        HiveError::CorruptLog {
            line,
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's input rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(self, HiveError::InvalidKey(_) | HiveError::InvalidValue(_))
    }
}
