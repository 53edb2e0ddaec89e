//! Snapshot Module
//!
//! The compacted, tombstone-free image of the live key set.
//!
//! ## Responsibilities
//! - Write the live keys to a temporary file during compaction
//! - Install it over the previous snapshot with a single rename
//! - Load it into the index at startup, before WAL replay
//!
//! ## File Format
//! Same line format as the WAL; every record is a `PUT`:
//! ```text
//! PUT|user:2|bob|1718000090\n
//! PUT|user:3|carol|1718000090\n
//! ```
//!
//! The previous snapshot stays valid until the rename completes, so a crash
//! at any point leaves either the old or the new snapshot, never a partial one.
//! When archiving is on, the previous snapshot is first linked (or copied) to
//! `snapshot.db_<unix secs>`; archives are never read back or pruned.

mod builder;

pub use builder::{PendingSnapshot, SnapshotBuilder};

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{HiveError, Result};
use crate::index::Index;
use crate::wal::{Operation, WalReader};

/// Suffix of the in-progress snapshot written by compaction
pub const TEMP_SUFFIX: &str = ".tmp";

/// Metadata about an installed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// File path
    pub path: PathBuf,
    /// Number of records (live keys)
    pub entry_count: u64,
    /// File size in bytes
    pub file_size: u64,
}

impl Snapshot {
    /// Path of the temporary file used while building a snapshot for `path`
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Path of the archive copy of `path` taken at `timestamp`
    pub fn archive_path(path: &Path, timestamp: u64) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!("_{}", timestamp));
        PathBuf::from(name)
    }

    /// Load the snapshot at `path` into `index`
    ///
    /// Returns `None` if no snapshot exists yet. Anything other than a
    /// complete `PUT` record is corruption: snapshots are only ever installed
    /// whole.
    pub fn load(path: &Path, index: &mut Index) -> Result<Option<Snapshot>> {
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = WalReader::open(path)?;
        while let Some(entry) = reader.next_entry()? {
            match entry.operation {
                Operation::Put { key, value } => index.put(key, Bytes::from(value)),
                other => {
                    return Err(HiveError::corrupt(
                        reader.lines_read(),
                        format!("snapshot contains a {} record", other.tag()),
                    ));
                }
            }
        }

        if let Some(bytes) = reader.torn_tail_bytes() {
            return Err(HiveError::corrupt(
                reader.lines_read() + 1,
                format!("snapshot ends with {} bytes of a partial record", bytes),
            ));
        }

        Ok(Some(Snapshot {
            path: path.to_path_buf(),
            entry_count: reader.lines_read(),
            file_size: fs::metadata(path)?.len(),
        }))
    }

    /// Remove a temporary snapshot left behind by an interrupted compaction
    ///
    /// Returns true if one was found.
    pub fn remove_stale_temp(path: &Path) -> Result<bool> {
        let temp = Self::temp_path(path);
        match fs::remove_file(&temp) {
            Ok(()) => {
                tracing::warn!(path = %temp.display(), "removed stale temporary snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
