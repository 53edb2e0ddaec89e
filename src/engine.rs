//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, Index and Snapshot
//! - Handle concurrent read/write access
//! - Trigger compactions when enough mutations have accumulated
//! - Manage crash recovery on startup

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::compaction::{
    CompactionEvent, CompactionOutcome, CompactionScheduler, CompactionStats, Compactor, Trigger,
};
use crate::config::Config;
use crate::error::{HiveError, Result};
use crate::index::Index;
use crate::snapshot::{PendingSnapshot, Snapshot, SnapshotBuilder};
use crate::wal::{validate_key, validate_value, Operation, WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **State lock** (`RwLock<EngineState>`): guards the index, the WAL
///   handle and the mutation counter together.
///   - `get` takes it shared, so reads run in parallel
///   - `put` / `delete` / `compact` take it exclusively
///
/// - **Compaction gate** (`Mutex<()>`): taken with `try_lock` before the
///   state lock. A compaction that finds it held returns `Skipped`, so the
///   interval and threshold triggers can never run two compactions at once.
///
/// Share the engine as `Arc<Engine>`. The compaction thread holds only the
/// inner core, so dropping the last `Engine` handle stops it.
pub struct Engine {
    core: Arc<EngineCore>,

    /// Background compaction thread (absent when both triggers are disabled)
    scheduler: Option<CompactionScheduler>,

    /// Reports from background compactions
    events: Receiver<CompactionEvent>,
}

struct EngineCore {
    /// Engine configuration
    config: Config,

    wal_path: PathBuf,
    snapshot_path: PathBuf,

    state: RwLock<EngineState>,

    /// Held for the whole of a compaction
    compaction_gate: Mutex<()>,

    /// Threshold requests to the scheduler (capacity 1, so bursts coalesce)
    compaction_requests: Sender<Trigger>,

    compactions_completed: AtomicU64,
}

struct EngineState {
    index: Index,

    /// Durability log (exclusive access needed)
    wal: WalWriter,

    /// PUT/DELETE records appended since the last compaction
    mutations: u64,

    /// Last installed snapshot
    snapshot: Option<Snapshot>,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub live_keys: usize,
    pub tombstones: usize,
    pub pending_mutations: u64,
    pub wal_records: u64,
    pub wal_bytes: u64,
    pub snapshot_records: Option<u64>,
    pub compactions_completed: u64,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    pub const WAL_FILENAME: &'static str = "wal.log";
    pub const SNAPSHOT_FILENAME: &'static str = "snapshot.db";

    /// Capacity of the background event channel
    const EVENT_CAPACITY: usize = 64;

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Discard a temporary snapshot left by an interrupted compaction
    /// 3. Load the snapshot into the index
    /// 4. Open the WAL (dropping a torn final record) and replay it
    /// 5. Start the compaction scheduler
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        // Step 2: A leftover temp file was never installed, so it holds nothing
        // the snapshot + WAL pair does not.
        Snapshot::remove_stale_temp(&snapshot_path)?;

        // Step 3: Snapshot first, then the log on top of it
        let mut index = Index::new();
        let snapshot = Snapshot::load(&snapshot_path, &mut index)?;

        // Step 4: Replay the WAL
        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        let mut mutations = 0u64;
        let recovery = WalRecovery::replay(&wal_path, |entry| {
            index.apply(&entry.operation);
            if !matches!(entry.operation, Operation::CompactMarker) {
                mutations += 1;
            }
        })?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            snapshot_records = snapshot.as_ref().map(|s| s.entry_count).unwrap_or(0),
            wal_records = recovery.entries_recovered,
            live_keys = index.live_count(),
            tombstones = index.tombstone_count(),
            "recovered engine state"
        );

        // Step 5: Wire up the scheduler
        let (request_tx, request_rx) = channel::bounded(1);
        let (event_tx, event_rx) = channel::bounded(Self::EVENT_CAPACITY);

        let core = Arc::new(EngineCore {
            wal_path,
            snapshot_path,
            state: RwLock::new(EngineState {
                index,
                wal,
                mutations,
                snapshot,
            }),
            compaction_gate: Mutex::new(()),
            compaction_requests: request_tx,
            compactions_completed: AtomicU64::new(0),
            config,
        });

        let scheduler = if core.config.compaction_interval.is_some()
            || core.config.compaction_threshold.is_some()
        {
            Some(CompactionScheduler::spawn(
                core.clone(),
                core.config.compaction_interval,
                request_rx,
                event_tx,
            )?)
        } else {
            None
        };

        // Recovered history may already be over the threshold
        if core.threshold_reached(mutations) {
            core.request_compaction();
        }

        Ok(Self {
            core,
            scheduler,
            events: event_rx,
        })
    }

    /// Get a value by key
    ///
    /// Served from the index only; `NotFound` if absent or deleted.
    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        self.core
            .state
            .read()
            .index
            .lookup(key)
            .ok_or(HiveError::NotFound)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the state lock exclusively
    /// 2. Write to WAL (durability); on failure the index is untouched
    /// 3. Write to the index
    /// 4. Count the mutation, maybe request a compaction
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        let mut state = self.core.state.write();

        state.wal.append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;

        state
            .index
            .put(key.to_vec(), Bytes::copy_from_slice(value));

        self.core.record_mutation(&mut state);
        Ok(())
    }

    /// Delete a key
    ///
    /// `NotFound` if the key is absent or already deleted; in that case
    /// nothing is appended to the WAL.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        validate_key(key)?;

        let mut state = self.core.state.write();
        if !state.index.contains_live(key) {
            return Err(HiveError::NotFound);
        }

        state.wal.append(Operation::Delete { key: key.to_vec() })?;
        state.index.tombstone(key.to_vec());

        self.core.record_mutation(&mut state);
        Ok(())
    }

    /// Compact now, from the caller's thread
    ///
    /// Returns `Skipped` if a compaction is already running.
    pub fn compact(&self) -> Result<CompactionOutcome> {
        self.core.compact()
    }

    /// Close the engine gracefully
    ///
    /// Stops the scheduler (waiting for a running compaction), then syncs and
    /// closes the WAL.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
        self.core.state.write().wal.close()?;
        tracing::info!("engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Reports from background compactions
    ///
    /// The channel is bounded; events are dropped while nobody drains it.
    pub fn compaction_events(&self) -> Receiver<CompactionEvent> {
        self.events.clone()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.core.state.read().index.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tombstones waiting for the next compaction
    pub fn tombstone_count(&self) -> usize {
        self.core.state.read().index.tombstone_count()
    }

    /// Mutations since the last compaction
    pub fn pending_mutations(&self) -> u64 {
        self.core.state.read().mutations
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.core.state.read();
        EngineStats {
            live_keys: state.index.live_count(),
            tombstones: state.index.tombstone_count(),
            pending_mutations: state.mutations,
            wal_records: state.wal.record_count(),
            wal_bytes: state.wal.len(),
            snapshot_records: state.snapshot.as_ref().map(|s| s.entry_count),
            compactions_completed: self.core.compactions_completed.load(Ordering::Relaxed),
        }
    }

    pub fn wal_path(&self) -> &Path {
        &self.core.wal_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.core.snapshot_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.core.config
    }
}

impl EngineCore {
    fn threshold_reached(&self, mutations: u64) -> bool {
        matches!(self.config.compaction_threshold, Some(limit) if mutations >= limit)
    }

    /// Count a mutation (state lock held)
    fn record_mutation(&self, state: &mut EngineState) {
        state.mutations += 1;
        if self.threshold_reached(state.mutations) {
            self.request_compaction();
        }
    }

    /// Post a threshold request without blocking
    fn request_compaction(&self) {
        match self.compaction_requests.try_send(Trigger::Threshold) {
            Ok(()) => tracing::debug!("compaction threshold reached, compaction requested"),
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("compaction threshold reached but scheduler is stopped")
            }
        }
    }

    /// Steps 3-7 of a compaction (both locks held)
    fn compact_locked(&self, state: &mut EngineState) -> Result<CompactionStats> {
        let started = Instant::now();

        // Steps 3-4: Live keys to a synced temporary file
        let pending = self.write_snapshot(&state.index)?;
        let live_keys = pending.entry_count();

        let archive = if self.config.archive_snapshots {
            match pending.archive_previous() {
                Ok(archive) => archive,
                Err(e) => {
                    pending.abort();
                    return Err(e);
                }
            }
        } else {
            None
        };

        // Step 5: Atomic install; the old snapshot is valid until here
        let snapshot = pending.install()?;
        let snapshot_bytes = snapshot.file_size;
        state.snapshot = Some(snapshot);

        // Step 6: Fresh log. Until this point the old log replays to the same
        // state on top of the new snapshot.
        let fresh = WalWriter::create(&self.wal_path, self.config.wal_sync_strategy)?;
        let mut old = std::mem::replace(&mut state.wal, fresh);
        if let Err(e) = old.close() {
            tracing::warn!(error = %e, "failed to close previous WAL handle");
        }
        state.wal.append(Operation::CompactMarker)?;

        // Step 7
        let tombstones_dropped = state.index.prune_tombstones() as u64;
        state.mutations = 0;

        Ok(CompactionStats {
            live_keys,
            tombstones_dropped,
            snapshot_bytes,
            archive,
            duration: started.elapsed(),
        })
    }

    fn write_snapshot(&self, index: &Index) -> Result<PendingSnapshot> {
        let mut builder = SnapshotBuilder::new(&self.snapshot_path)?;
        for (key, value) in index.iter_live() {
            if let Err(e) = builder.add(key, value) {
                builder.abort();
                return Err(e);
            }
        }
        builder.finish()
    }
}

impl Compactor for EngineCore {
    fn compact(&self) -> Result<CompactionOutcome> {
        // Step 1: Never queue behind a running compaction
        let Some(_gate) = self.compaction_gate.try_lock() else {
            tracing::debug!("compaction already in progress, skipping");
            return Ok(CompactionOutcome::Skipped);
        };

        // Step 2
        let mut state = self.state.write();

        let result = self.compact_locked(&mut state);
        match result {
            Ok(stats) => {
                self.compactions_completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    live_keys = stats.live_keys,
                    tombstones_dropped = stats.tombstones_dropped,
                    snapshot_bytes = stats.snapshot_bytes,
                    "compaction finished"
                );
                Ok(CompactionOutcome::Completed(stats))
            }
            // Nothing was installed, or the old log still replays to the
            // same state: durable state is consistent either way.
            Err(e) => Err(HiveError::Compaction(Box::new(e))),
        }
    }
}
