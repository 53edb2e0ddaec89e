//! Engine test target


use hive::config::{Config, WalSyncStrategy};
use hive::engine::Engine;
use tempfile::TempDir;

/// Engine with both background triggers off
pub fn setup_manual_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_manual(&temp_dir);
    (temp_dir, engine)
}

pub fn open_manual(dir: &TempDir) -> Engine {
    let config = Config::builder()
        .data_dir(dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .manual_compaction_only()
        .build();
    Engine::open(config).unwrap()
}
