//! Configuration for Hive
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HiveError, Result};

/// Main configuration for a Hive instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (durability log)
    ///     └── snapshot.db      (compacted live keys)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Period of the background compaction. `None` disables the timer.
    pub compaction_interval: Option<Duration>,

    /// Mutations since the last compaction that trigger a background
    /// compaction. `None` disables the threshold trigger.
    pub compaction_threshold: Option<u64>,

    /// Keep a timestamped copy of the previous snapshot
    /// (`snapshot.db_<unix secs>`) each time compaction replaces it
    pub archive_snapshots: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,
}

/// WAL sync strategy
///
/// Every append is flushed to the OS before it is acknowledged; the strategy
/// only controls how often the file is fsynced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl WalSyncStrategy {
    /// Build a strategy from a "sync every N appends" count
    pub fn from_count(count: usize) -> Self {
        if count <= 1 {
            WalSyncStrategy::EveryWrite
        } else {
            WalSyncStrategy::EveryNEntries { count }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            compaction_interval: Some(Duration::from_secs(90)),
            compaction_threshold: Some(30),
            archive_snapshots: true,
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(HiveError::Config("data_dir must not be empty".into()));
        }
        if self.compaction_interval == Some(Duration::ZERO) {
            return Err(HiveError::Config(
                "compaction_interval must be positive (use None to disable)".into(),
            ));
        }
        if self.compaction_threshold == Some(0) {
            return Err(HiveError::Config(
                "compaction_threshold must be positive (use None to disable)".into(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(HiveError::Config("sync count must be positive".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the background compaction period (`None` disables it)
    pub fn compaction_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.compaction_interval = interval;
        self
    }

    /// Set the mutation threshold for background compaction (`None` disables it)
    pub fn compaction_threshold(mut self, threshold: Option<u64>) -> Self {
        self.config.compaction_threshold = threshold;
        self
    }

    /// Disable both background compaction triggers
    pub fn manual_compaction_only(self) -> Self {
        self.compaction_interval(None).compaction_threshold(None)
    }

    /// Keep or skip archive copies of replaced snapshots
    pub fn archive_snapshots(mut self, enabled: bool) -> Self {
        self.config.archive_snapshots = enabled;
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
