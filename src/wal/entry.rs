//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their text codec.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{HiveError, Result};

/// Separates the four fields of a record
pub const FIELD_DELIMITER: u8 = b'|';

/// Terminates every record
pub const RECORD_TERMINATOR: u8 = b'\n';

const PUT_TAG: &str = "PUT";
const DELETE_TAG: &str = "DELETE";
const COMPACT_MARKER_TAG: &str = "COMPACT_MARKER";

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix seconds) when entry was created. Informational only,
    /// log order is authoritative.
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Audit record written as the first line of a freshly compacted log
    CompactMarker,
}

impl Operation {
    /// The operation name as written in the log
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Put { .. } => PUT_TAG,
            Operation::Delete { .. } => DELETE_TAG,
            Operation::CompactMarker => COMPACT_MARKER_TAG,
        }
    }

    /// Key bytes (empty for the compaction marker)
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
            Operation::CompactMarker => &[],
        }
    }

    /// Value bytes (empty unless this is a put)
    pub fn value(&self) -> &[u8] {
        match self {
            Operation::Put { value, .. } => value,
            _ => &[],
        }
    }

    /// Check the key and value can be written without breaking the framing
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Put { key, value } => {
                validate_key(key)?;
                validate_value(value)
            }
            Operation::Delete { key } => validate_key(key),
            Operation::CompactMarker => Ok(()),
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(operation: Operation) -> Self {
        Self::with_timestamp(operation, unix_timestamp())
    }

    pub fn with_timestamp(operation: Operation, timestamp: u64) -> Self {
        Self {
            operation,
            timestamp,
        }
    }

    /// Serialize to one newline-terminated line
    ///
    /// Callers must have validated the operation first.
    pub fn encode(&self) -> Vec<u8> {
        let key = self.operation.key();
        let value = self.operation.value();
        let timestamp = self.timestamp.to_string();
        let tag = self.operation.tag();

        let mut line = Vec::with_capacity(tag.len() + key.len() + value.len() + timestamp.len() + 4);
        line.extend_from_slice(tag.as_bytes());
        line.push(FIELD_DELIMITER);
        line.extend_from_slice(key);
        line.push(FIELD_DELIMITER);
        line.extend_from_slice(value);
        line.push(FIELD_DELIMITER);
        line.extend_from_slice(timestamp.as_bytes());
        line.push(RECORD_TERMINATOR);
        line
    }

    /// Parse one line (without its terminator)
    ///
    /// `line_no` is 1-based and only used for error reporting.
    pub fn decode(line: &[u8], line_no: u64) -> Result<Self> {
        let text = std::str::from_utf8(line)
            .map_err(|_| HiveError::corrupt(line_no, "record is not valid UTF-8"))?;

        let fields: Vec<&str> = text.split(FIELD_DELIMITER as char).collect();
        let [tag, key, value, timestamp] = fields.as_slice() else {
            return Err(HiveError::corrupt(
                line_no,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        };

        let timestamp: u64 = timestamp
            .parse()
            .map_err(|_| HiveError::corrupt(line_no, format!("invalid timestamp {:?}", timestamp)))?;

        let operation = match *tag {
            PUT_TAG if !key.is_empty() => Operation::Put {
                key: key.as_bytes().to_vec(),
                value: value.as_bytes().to_vec(),
            },
            DELETE_TAG if !key.is_empty() && value.is_empty() => Operation::Delete {
                key: key.as_bytes().to_vec(),
            },
            COMPACT_MARKER_TAG if key.is_empty() && value.is_empty() => Operation::CompactMarker,
            PUT_TAG | DELETE_TAG | COMPACT_MARKER_TAG => {
                return Err(HiveError::corrupt(
                    line_no,
                    format!("malformed {} record", tag),
                ));
            }
            other => {
                return Err(HiveError::corrupt(
                    line_no,
                    format!("unknown operation {:?}", other),
                ));
            }
        };

        Ok(Self {
            operation,
            timestamp,
        })
    }
}

/// Seconds since the Unix epoch (0 if the clock is before it)
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Keys must be non-empty UTF-8 without the delimiter or line breaks
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(HiveError::InvalidKey("key must not be empty".into()));
    }
    check_field(key).map_err(HiveError::InvalidKey)
}

/// Values may be empty but share the key alphabet
pub fn validate_value(value: &[u8]) -> Result<()> {
    check_field(value).map_err(HiveError::InvalidValue)
}

fn check_field(field: &[u8]) -> std::result::Result<(), String> {
    if std::str::from_utf8(field).is_err() {
        return Err("must be valid UTF-8".into());
    }
    match field
        .iter()
        .find(|b| matches!(**b, FIELD_DELIMITER | RECORD_TERMINATOR | b'\r'))
    {
        Some(b) => Err(format!("must not contain {:?}", *b as char)),
        None => Ok(()),
    }
}
