//! Index implementation
//!
//! BTreeMap-based key index with tombstones.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::wal::Operation;
use super::IndexEntry;

/// In-memory key index
#[derive(Debug, Default)]
pub struct Index {
    entries: BTreeMap<Vec<u8>, IndexEntry>,

    /// Number of tombstones currently held
    tombstones: usize,
}

impl Index {
    /// Create a new empty Index
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry for a key, tombstones included
    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Live value for a key; `None` if absent or tombstoned
    pub fn lookup(&self, key: &[u8]) -> Option<Bytes> {
        self.entries.get(key).and_then(IndexEntry::value).cloned()
    }

    pub fn contains_live(&self, key: &[u8]) -> bool {
        matches!(self.entries.get(key), Some(IndexEntry::Value(_)))
    }

    /// Insert or overwrite a live value
    pub fn put(&mut self, key: Vec<u8>, value: Bytes) {
        if let Some(IndexEntry::Tombstone) = self.entries.insert(key, IndexEntry::Value(value)) {
            self.tombstones -= 1;
        }
    }

    /// Mark a key deleted. Returns true if it held a live value.
    pub fn tombstone(&mut self, key: Vec<u8>) -> bool {
        match self.entries.insert(key, IndexEntry::Tombstone) {
            Some(IndexEntry::Value(_)) => {
                self.tombstones += 1;
                true
            }
            Some(IndexEntry::Tombstone) => false,
            None => {
                self.tombstones += 1;
                false
            }
        }
    }

    /// Apply one replayed log operation
    pub fn apply(&mut self, operation: &Operation) {
        match operation {
            Operation::Put { key, value } => self.put(key.clone(), Bytes::copy_from_slice(value)),
            Operation::Delete { key } => {
                self.tombstone(key.clone());
            }
            Operation::CompactMarker => {}
        }
    }

    /// Live entries in sorted key order
    pub fn iter_live(&self) -> impl Iterator<Item = (&[u8], &Bytes)> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, entry)| entry.value().map(|value| (key.as_slice(), value)))
    }

    /// Drop every tombstone. Returns how many were removed.
    pub fn prune_tombstones(&mut self) -> usize {
        let removed = self.tombstones;
        self.entries.retain(|_, entry| !entry.is_tombstone());
        self.tombstones = 0;
        removed
    }

    /// Number of live keys
    pub fn live_count(&self) -> usize {
        self.entries.len() - self.tombstones
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    /// Entries including tombstones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tombstones = 0;
    }
}
