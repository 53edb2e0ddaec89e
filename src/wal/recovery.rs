//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::path::Path;

use crate::error::Result;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Last valid LSN (0 for an empty log)
    pub last_lsn: u64,

    /// Whether an unterminated final line was found and skipped
    pub was_truncated: bool,

    /// Size of the skipped tail in bytes
    pub truncated_bytes: u64,

    /// Byte length of the well-formed prefix
    pub valid_len: u64,
}

impl WalRecovery {
    /// Replay every entry in file order
    ///
    /// The file is never modified. A torn final line ends the replay; any
    /// other malformed line fails it with `CorruptLog`.
    pub fn replay<F>(path: &Path, mut visitor: F) -> Result<RecoveryResult>
    where
        F: FnMut(&WalEntry),
    {
        let mut reader = WalReader::open(path)?;
        while let Some(entry) = reader.next_entry()? {
            visitor(&entry);
        }

        let truncated_bytes = reader.torn_tail_bytes().unwrap_or(0);
        Ok(RecoveryResult {
            entries_recovered: reader.lines_read(),
            last_lsn: reader.lines_read(),
            was_truncated: reader.torn_tail_bytes().is_some(),
            truncated_bytes,
            valid_len: reader.valid_len(),
        })
    }

    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at a torn write at the end
    /// 3. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let result = Self::replay(path, |entry| entries.push(entry.clone()))?;
        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    ///
    /// A missing file verifies as an empty log.
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }
        Self::replay(path, |_| {})
    }
}
