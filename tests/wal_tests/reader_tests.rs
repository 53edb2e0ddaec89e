//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries back in order
//! - Torn tail detection
//! - Corruption reporting with line numbers

use std::fs;
use std::path::PathBuf;

use hive::config::WalSyncStrategy;
use hive::wal::{Operation, WalReader, WalWriter};
use hive::HiveError;
use tempfile::TempDir;

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.lines_read(), 0);
    assert_eq!(reader.torn_tail_bytes(), None);
}

#[test]
fn test_open_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    assert!(matches!(WalReader::open(&wal_path), Err(HiveError::Io(_))));
}

#[test]
fn test_read_all_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(entries.len(), 5);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.operation.key(), format!("key{}", i).as_bytes());
        assert_eq!(entry.operation.value(), format!("value{}", i).as_bytes());
    }
}

#[test]
fn test_torn_tail_ends_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    // Chop off the last few bytes to simulate a crash mid-write
    let len = fs::metadata(&wal_path).unwrap().len();
    let file = fs::OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 3).unwrap();
    drop(file);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let mut count = 0;
    while let Some(_) = reader.next_entry().unwrap() {
        count += 1;
    }

    assert_eq!(count, 4);
    assert!(reader.torn_tail_bytes().unwrap() > 0);
    assert_eq!(reader.valid_len() + reader.torn_tail_bytes().unwrap(), len - 3);

    // The file is not touched by reading
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len - 3);
}

#[test]
fn test_corrupt_line_reports_line_number() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"PUT|a|1|10\nPUT|b|2\nPUT|c|3|12\n").unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    // First entry, then the error, then the iterator stops
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(HiveError::CorruptLog { line, .. }) => assert_eq!(*line, 2),
        other => panic!("expected CorruptLog, got {:?}", other),
    }
}

#[test]
fn test_malformed_last_complete_line_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"PUT|a|1|10\nPUT|b|2|nope\n").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(matches!(
        reader.next_entry(),
        Err(HiveError::CorruptLog { line: 2, .. })
    ));
}

#[test]
fn test_blank_line_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"PUT|a|1|10\n\n").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    reader.next_entry().unwrap();
    assert!(matches!(
        reader.next_entry(),
        Err(HiveError::CorruptLog { line: 2, .. })
    ));
}
