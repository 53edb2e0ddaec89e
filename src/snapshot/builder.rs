//! Snapshot Builder
//!
//! Writes live key-value pairs to a temporary snapshot file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{HiveError, Result};
use crate::wal::{unix_timestamp, Operation, WalEntry};

use super::Snapshot;

/// Builder for a new snapshot
///
/// Writes into `<target>.tmp`; nothing becomes visible at `target` until
/// `finish()` + `PendingSnapshot::install()`.
pub struct SnapshotBuilder {
    /// Where the snapshot will be installed
    target: PathBuf,
    /// Temporary file path
    temp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Bytes written
    bytes_written: u64,
    /// One timestamp for every record of this snapshot
    timestamp: u64,
}

impl SnapshotBuilder {
    /// Start a snapshot destined for `target`
    pub fn new(target: &Path) -> Result<Self> {
        let temp_path = Snapshot::temp_path(target);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            writer: BufWriter::new(file),
            entry_count: 0,
            bytes_written: 0,
            timestamp: unix_timestamp(),
        })
    }

    /// Add a live key-value pair
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let operation = Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        operation.validate()?;

        let line = WalEntry::with_timestamp(operation, self.timestamp).encode();
        self.writer.write_all(&line)?;
        self.bytes_written += line.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Flush, fsync and close the temporary file
    ///
    /// On error the temporary file is removed.
    pub fn finish(self) -> Result<PendingSnapshot> {
        let synced = match self.writer.into_inner() {
            Ok(file) => file.sync_all().map_err(HiveError::from),
            Err(e) => Err(HiveError::Io(e.into_error())),
        };
        if let Err(e) = synced {
            remove_temp(&self.temp_path);
            return Err(e);
        }

        Ok(PendingSnapshot {
            target: self.target,
            temp_path: self.temp_path,
            entry_count: self.entry_count,
            file_size: self.bytes_written,
        })
    }

    /// Discard the partial snapshot
    pub fn abort(self) {
        let temp_path = self.temp_path.clone();
        drop(self.writer);
        remove_temp(&temp_path);
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

/// A fully written snapshot that has not yet replaced the current one
#[derive(Debug)]
pub struct PendingSnapshot {
    target: PathBuf,
    temp_path: PathBuf,
    entry_count: u64,
    file_size: u64,
}

impl PendingSnapshot {
    /// Atomically replace the current snapshot with this one
    pub fn install(self) -> Result<Snapshot> {
        if let Err(e) = fs::rename(&self.temp_path, &self.target) {
            remove_temp(&self.temp_path);
            return Err(e.into());
        }
        sync_parent_dir(&self.target)?;

        Ok(Snapshot {
            path: self.target,
            entry_count: self.entry_count,
            file_size: self.file_size,
        })
    }

    /// Preserve the snapshot this one is about to replace
    ///
    /// Hard-links the current snapshot to its archive path, falling back to a
    /// copy. An archive from the same second is replaced. Returns `None` when
    /// there is no current snapshot.
    pub fn archive_previous(&self) -> Result<Option<PathBuf>> {
        if !self.target.exists() {
            return Ok(None);
        }
        let archive = Snapshot::archive_path(&self.target, unix_timestamp());

        match fs::hard_link(&self.target, &archive) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                fs::remove_file(&archive)?;
                fs::hard_link(&self.target, &archive)?;
            }
            Err(e) => {
                tracing::debug!(error = %e, "hard link failed, copying snapshot archive");
                fs::copy(&self.target, &archive)?;
            }
        }
        sync_parent_dir(&archive)?;

        tracing::info!(archive = %archive.display(), "archived previous snapshot");
        Ok(Some(archive))
    }

    /// Discard the temporary file; the current snapshot stays in place
    pub fn abort(self) {
        remove_temp(&self.temp_path);
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary snapshot");
        }
    }
}

/// Make a rename in `path`'s directory durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
