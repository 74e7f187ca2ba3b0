//! Shared value types: records and timestamps.

use chrono::{DateTime, Utc};

/// One upstream record as produced by a loader. Always a JSON object in practice.
pub type Record = serde_json::Value;

/// Wall-clock instant used for build times, turn times and retention cutoffs.
pub type Timestamp = DateTime<Utc>;

/// Read a string field from a record, if present.
pub fn record_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(|v| v.as_str())
}

/// Byte length of the canonical JSON form of a serializable value.
pub fn serialized_len<T: serde::Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(usize::MAX)
}
