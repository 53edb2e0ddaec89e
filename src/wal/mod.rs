//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per mutation before it is acknowledged
//! - Log Sequence Numbers (LSN) for ordering within the current log file
//! - Crash recovery and replay
//! - Tolerate a torn final line left by a crash mid-append
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ PUT|user:1|alice|1718000000\n                │
//! │ PUT|user:2|bob|1718000003\n                  │
//! │ DELETE|user:1||1718000007\n                  │
//! │ COMPACT_MARKER|||1718000090\n                │
//! └──────────────────────────────────────────────┘
//!   operation | key | value | timestamp (unix secs)
//! ```
//!
//! A final line without `\n` is a torn write: replay stops before it and the
//! writer truncates it away on open. A complete line that does not parse is
//! corruption.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{
    unix_timestamp, validate_key, validate_value, Operation, WalEntry, FIELD_DELIMITER,
    RECORD_TERMINATOR,
};
pub use writer::WalWriter;
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
