//! Index Module
//!
//! In-memory map from key to the current value, the read path of record.
//!
//! ## Responsibilities
//! - Serve every `get` without touching disk
//! - Hold tombstones for deleted keys until the next compaction
//! - Enumerate live keys in sorted order for snapshot writing
//! - Rebuild deterministically from snapshot + WAL replay
//!
//! ## Data Structure Choice
//! A plain BTreeMap with no lock of its own. The engine guards it together
//! with the WAL handle under a single RwLock, so every mutation and its log
//! append happen under the same exclusive guard.

mod table;

pub use table::Index;

use bytes::Bytes;

/// Entry stored in the Index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEntry {
    /// A live value
    Value(Bytes),

    /// A tombstone (deleted key)
    Tombstone,
}

impl IndexEntry {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, IndexEntry::Tombstone)
    }

    /// The live value, if any
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            IndexEntry::Value(value) => Some(value),
            IndexEntry::Tombstone => None,
        }
    }
}
