//! Tests for WAL Entry
//!
//! These tests verify:
//! - Text encoding of each operation
//! - Decoding and its corruption checks
//! - Key/value validation

use hive::wal::{validate_key, validate_value, Operation, WalEntry};
use hive::HiveError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_put() {
    let entry = WalEntry::with_timestamp(
        Operation::Put {
            key: b"user:1".to_vec(),
            value: b"alice".to_vec(),
        },
        1718000000,
    );

    assert_eq!(entry.encode(), b"PUT|user:1|alice|1718000000\n".to_vec());
}

#[test]
fn test_encode_delete_has_empty_value() {
    let entry = WalEntry::with_timestamp(Operation::Delete { key: b"k".to_vec() }, 7);

    assert_eq!(entry.encode(), b"DELETE|k||7\n".to_vec());
}

#[test]
fn test_encode_compact_marker() {
    let entry = WalEntry::with_timestamp(Operation::CompactMarker, 42);

    assert_eq!(entry.encode(), b"COMPACT_MARKER|||42\n".to_vec());
}

#[test]
fn test_new_entry_is_stamped_with_current_time() {
    let before = hive::wal::unix_timestamp();
    let entry = WalEntry::new(Operation::CompactMarker);
    let after = hive::wal::unix_timestamp();

    assert!(entry.timestamp >= before && entry.timestamp <= after);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_put_with_empty_value() {
    let entry = WalEntry::decode(b"PUT|k||5", 1).unwrap();

    assert_eq!(
        entry.operation,
        Operation::Put {
            key: b"k".to_vec(),
            value: Vec::new()
        }
    );
    assert_eq!(entry.timestamp, 5);
}

#[test]
fn test_decode_each_operation() {
    let del = WalEntry::decode(b"DELETE|gone||9", 1).unwrap();
    assert_eq!(del.operation, Operation::Delete { key: b"gone".to_vec() });

    let marker = WalEntry::decode(b"COMPACT_MARKER|||9", 1).unwrap();
    assert_eq!(marker.operation, Operation::CompactMarker);
}

#[test]
fn test_decode_rejects_wrong_field_count() {
    let err = WalEntry::decode(b"PUT|k|v", 3).unwrap_err();

    match err {
        HiveError::CorruptLog { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("4 fields"), "reason was {}", reason);
        }
        other => panic!("expected CorruptLog, got {:?}", other),
    }
}

#[test]
fn test_decode_rejects_non_numeric_timestamp() {
    let err = WalEntry::decode(b"PUT|k|v|soon", 1).unwrap_err();
    assert!(matches!(err, HiveError::CorruptLog { line: 1, .. }));
}

#[test]
fn test_decode_rejects_unknown_operation() {
    let err = WalEntry::decode(b"UPSERT|k|v|1", 2).unwrap_err();
    assert!(matches!(err, HiveError::CorruptLog { line: 2, .. }));
}

#[test]
fn test_decode_rejects_put_without_key() {
    assert!(WalEntry::decode(b"PUT||v|1", 1).is_err());
    assert!(WalEntry::decode(b"DELETE|||1", 1).is_err());
}

#[test]
fn test_decode_rejects_delete_with_value() {
    assert!(WalEntry::decode(b"DELETE|k|v|1", 1).is_err());
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    let err = WalEntry::decode(b"PUT|\xff\xfe|v|1", 4).unwrap_err();
    assert!(matches!(err, HiveError::CorruptLog { line: 4, .. }));
}

#[test]
fn test_decode_inverts_encode() {
    let entry = WalEntry::with_timestamp(
        Operation::Put {
            key: "ключ".as_bytes().to_vec(),
            value: b"a:b c".to_vec(),
        },
        123,
    );
    let line = entry.encode();

    let decoded = WalEntry::decode(&line[..line.len() - 1], 1).unwrap();
    assert_eq!(decoded, entry);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_key() {
    assert!(validate_key(b"ok").is_ok());
    assert!(matches!(validate_key(b""), Err(HiveError::InvalidKey(_))));
    assert!(matches!(validate_key(b"a|b"), Err(HiveError::InvalidKey(_))));
    assert!(matches!(validate_key(b"a\nb"), Err(HiveError::InvalidKey(_))));
    assert!(matches!(validate_key(b"a\rb"), Err(HiveError::InvalidKey(_))));
    assert!(matches!(validate_key(b"\xff"), Err(HiveError::InvalidKey(_))));
}

#[test]
fn test_validate_value() {
    assert!(validate_value(b"").is_ok());
    assert!(validate_value(b"with spaces and : colons").is_ok());
    assert!(matches!(validate_value(b"x|y"), Err(HiveError::InvalidValue(_))));
    assert!(matches!(validate_value(b"line\n"), Err(HiveError::InvalidValue(_))));
}

#[test]
fn test_operation_accessors() {
    let put = Operation::Put {
        key: b"k".to_vec(),
        value: b"v".to_vec(),
    };
    assert_eq!(put.tag(), "PUT");
    assert_eq!(put.key(), b"k");
    assert_eq!(put.value(), b"v");

    let marker = Operation::CompactMarker;
    assert_eq!(marker.tag(), "COMPACT_MARKER");
    assert!(marker.key().is_empty());
    assert!(marker.validate().is_ok());
}
