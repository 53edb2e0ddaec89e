//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Torn tail repair on open
//! - Close and create

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use hive::config::WalSyncStrategy;
use hive::wal::{Operation, WalReader, WalWriter};
use hive::HiveError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert!(wal_path.exists());
    assert!(writer.is_empty());
    assert_eq!(writer.current_lsn(), 1);
}

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(put("key1", "value1")).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);

    let lines = read_lines(&wal_path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("PUT|key1|value1|"));
}

#[test]
fn test_write_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let lsn1 = writer.append(put("a", "1")).unwrap();
    let lsn2 = writer.append(put("b", "2")).unwrap();
    let lsn3 = writer.append(Operation::Delete { key: b"a".to_vec() }).unwrap();

    assert_eq!(lsn1, 1);
    assert_eq!(lsn2, 2);
    assert_eq!(lsn3, 3);
    assert_eq!(writer.current_lsn(), 4);
    assert_eq!(writer.record_count(), 3);
    assert_eq!(writer.len(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer.append(put("b", "2")).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
    assert_eq!(read_lines(&wal_path).len(), 3);
}

#[test]
fn test_every_n_entries_still_flushes_each_append() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 100 }).unwrap();
    writer.append(put("a", "1")).unwrap();
    writer.append(put("b", "2")).unwrap();

    // Not fsynced yet, but already visible to a reader through the OS
    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(entries.len(), 2);

    writer.sync().unwrap();
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_append_rejects_delimiter_in_key() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let err = writer.append(put("a|b", "1")).unwrap_err();

    assert!(matches!(err, HiveError::InvalidKey(_)));
    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

#[test]
fn test_append_rejects_newline_in_value() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let err = writer.append(put("a", "1\n2")).unwrap_err();

    assert!(matches!(err, HiveError::InvalidValue(_)));
    assert!(writer.is_empty());
}

// =============================================================================
// Torn Tail Tests
// =============================================================================

#[test]
fn test_open_truncates_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
    }
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    // Simulate a crash halfway through the next append
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(b"PUT|b|partial").unwrap();
    drop(file);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
    assert_eq!(writer.current_lsn(), 2);

    writer.append(put("c", "3")).unwrap();
    let lines = read_lines(&wal_path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("PUT|c|3|"));
}

#[test]
fn test_open_keeps_file_without_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"PUT|a|1|10\n").unwrap();

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.len(), 11);
    assert_eq!(fs::read(&wal_path).unwrap(), b"PUT|a|1|10\n".to_vec());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_append_after_close_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();
    writer.close().unwrap();

    assert!(writer.is_closed());
    assert!(matches!(writer.append(put("b", "2")), Err(HiveError::WalClosed)));
    assert!(matches!(writer.sync(), Err(HiveError::WalClosed)));

    // Closing twice is harmless
    writer.close().unwrap();
}

#[test]
fn test_create_discards_existing_content() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"PUT|a|1|10\nPUT|b|2|11\n").unwrap();

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert!(writer.is_empty());
    assert_eq!(writer.current_lsn(), 1);

    writer.append(Operation::CompactMarker).unwrap();
    let lines = read_lines(&wal_path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("COMPACT_MARKER|||"));
}
