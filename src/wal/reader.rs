//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use super::{WalEntry, RECORD_TERMINATOR};

/// Reads entries from the WAL file, front to back
///
/// Never writes to the file. A trailing line without a terminator is treated
/// as the end of the log and remembered in `torn_tail_bytes`.
pub struct WalReader {
    reader: BufReader<File>,

    /// Number of complete lines consumed so far
    line: u64,

    /// Byte offset just past the last complete line
    valid_len: u64,

    /// Size of the unterminated tail, if one was hit
    torn_tail_bytes: Option<u64>,

    buf: Vec<u8>,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            line: 0,
            valid_len: 0,
            torn_tail_bytes: None,
            buf: Vec::new(),
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file or at a torn tail.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.torn_tail_bytes.is_some() {
            return Ok(None);
        }

        self.buf.clear();
        let n = self.reader.read_until(RECORD_TERMINATOR, &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() != Some(&RECORD_TERMINATOR) {
            tracing::warn!(
                bytes = n,
                after_line = self.line,
                "ignoring torn record at end of log"
            );
            self.torn_tail_bytes = Some(n as u64);
            return Ok(None);
        }

        self.line += 1;
        let entry = WalEntry::decode(&self.buf[..n - 1], self.line)?;
        self.valid_len += n as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Complete lines read so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Byte length of the well-formed prefix read so far
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Length of the torn tail, once the reader has reached it
    pub fn torn_tail_bytes(&self) -> Option<u64> {
        self.torn_tail_bytes
    }
}

/// Iterator over WAL entries. Stops after the first error.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl WalIterator {
    /// The underlying reader (for end-of-log statistics)
    pub fn reader(&self) -> &WalReader {
        &self.reader
    }
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Extent of the well-formed prefix of a log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LogExtent {
    /// Number of newline-terminated records
    pub records: u64,
    /// Offset just past the last terminator
    pub valid_len: u64,
    /// Total file length
    pub file_len: u64,
}

/// Count terminated records without parsing them
pub(crate) fn scan_extent(file: &File) -> Result<LogExtent> {
    let mut reader = BufReader::new(file);
    let mut extent = LogExtent {
        records: 0,
        valid_len: 0,
        file_len: 0,
    };

    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        for (i, byte) in chunk.iter().enumerate() {
            if *byte == RECORD_TERMINATOR {
                extent.records += 1;
                extent.valid_len = extent.file_len + i as u64 + 1;
            }
        }
        let len = chunk.len();
        extent.file_len += len as u64;
        reader.consume(len);
    }

    Ok(extent)
}
