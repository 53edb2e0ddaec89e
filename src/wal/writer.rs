//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{HiveError, Result};
use super::reader::scan_extent;
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
///
/// Each append writes one whole line straight to the file, so nothing is
/// buffered in user space between appends.
pub struct WalWriter {
    path: PathBuf,

    /// `None` once closed
    file: Option<File>,

    /// LSN the next append receives (1-based line number in this file)
    next_lsn: u64,

    /// Bytes in the file after the last successful append
    len: u64,

    sync_strategy: WalSyncStrategy,

    /// Appends since the last fsync
    unsynced: usize,

    /// Makes the next fsync fail
    #[cfg(test)]
    pub(crate) fail_next_sync: bool,
}

impl WalWriter {
    /// Open or create a WAL file for append
    ///
    /// A torn final line is truncated away so that the next record starts on
    /// a fresh line.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let extent = scan_extent(&file)?;
        if extent.valid_len < extent.file_len {
            tracing::warn!(
                path = %path.display(),
                torn_bytes = extent.file_len - extent.valid_len,
                "truncating torn record at end of log"
            );
            file.set_len(extent.valid_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            next_lsn: extent.records + 1,
            len: extent.valid_len,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Create a fresh, empty WAL at `path`, discarding any existing content
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            next_lsn: 1,
            len: 0,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append an entry to the WAL
    ///
    /// Returns the LSN of the new record once its bytes have reached the OS
    /// (and the disk, per the sync strategy).
    ///
    /// On a failed write the partial line is truncated away. On a failed
    /// fsync the record is truncated away as well and the writer is closed:
    /// after such a failure the file is in an unknown state, so later appends
    /// fail with `WalClosed` until the log is reopened.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        operation.validate()?;
        let line = WalEntry::new(operation).encode();
        let previous_len = self.len;

        let file = self.file.as_mut().ok_or(HiveError::WalClosed)?;
        if let Err(e) = file.write_all(&line).and_then(|_| file.flush()) {
            // Drop whatever part of the line made it out so the next append
            // does not fuse with it.
            self.roll_back(previous_len);
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.unsynced += 1;

        let sync_now = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if sync_now {
            if let Err(e) = self.sync_file() {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "WAL fsync failed, dropping record and closing log"
                );
                self.roll_back(previous_len);
                self.file = None;
                return Err(e.into());
            }
            self.unsynced = 0;
        }

        let lsn = self.next_lsn;
        self.next_lsn += 1;
        Ok(lsn)
    }

    /// Truncate the file back to `len` bytes
    fn roll_back(&mut self, len: u64) {
        if let Some(file) = self.file.as_ref() {
            if let Err(e) = file.set_len(len) {
                tracing::error!(error = %e, "failed to roll back WAL append");
            }
        }
        self.len = len;
    }

    fn sync_file(&mut self) -> std::io::Result<()> {
        if let Some(e) = self.injected_sync_failure() {
            return Err(e);
        }
        match self.file.as_ref() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    fn injected_sync_failure(&mut self) -> Option<std::io::Error> {
        std::mem::take(&mut self.fail_next_sync)
            .then(|| std::io::Error::new(std::io::ErrorKind::Other, "injected fsync failure"))
    }

    #[cfg(not(test))]
    fn injected_sync_failure(&mut self) -> Option<std::io::Error> {
        None
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(HiveError::WalClosed)?;
        file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Sync and release the file handle; later appends fail with `WalClosed`
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Records in the current log file
    pub fn record_count(&self) -> u64 {
        self.next_lsn - 1
    }

    /// Bytes in the current log file
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
