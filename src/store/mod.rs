//! Record store: the upstream system of record the loaders read from and the
//! retention sweeper prunes.

pub mod loader;
pub mod memory;
pub mod persistence;

pub use loader::StoreLoader;
pub use memory::MemoryRecordStore;
pub use persistence::SledRecordStore;

use crate::error::StorageError;
use crate::types::{Record, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

static RECORD_COUNTER: AtomicU64 = AtomicU64::new(1);

/// One stored upstream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub source: String,
    pub subject_id: String,
    /// Records without a scope belong to every scope of the subject.
    pub scope_id: Option<String>,
    pub created_at: Timestamp,
    pub payload: Record,
}

impl StoredRecord {
    /// Build a record, taking its id from the payload's `id` field when present.
    pub fn new(
        source: impl Into<String>,
        subject_id: impl Into<String>,
        scope_id: Option<String>,
        created_at: Timestamp,
        payload: Record,
    ) -> Self {
        let source = source.into();
        let id = match payload.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => next_record_id(&source, created_at),
        };
        Self {
            id,
            source,
            subject_id: subject_id.into(),
            scope_id,
            created_at,
            payload,
        }
    }

    /// Unique within a source.
    pub(crate) fn identity(&self) -> (String, String) {
        (self.subject_id.clone(), self.id.clone())
    }

    pub(crate) fn matches_scope(&self, scope_id: Option<&str>) -> bool {
        match (scope_id, self.scope_id.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(own)) => wanted == own,
        }
    }
}

fn next_record_id(source: &str, created_at: Timestamp) -> String {
    let seq = RECORD_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", source, created_at.timestamp_millis(), seq)
}

/// Storage port for upstream records.
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record (keyed by source, subject and id).
    fn put(&self, record: &StoredRecord) -> Result<(), StorageError>;

    /// Records of one source for a subject, newest first, at most `limit`.
    fn list(
        &self,
        source: &str,
        subject_id: &str,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StorageError>;

    /// Delete records of `source` created before `cutoff`, for all subjects.
    ///
    /// Never removes a subject's newest record of that source: a subject whose
    /// records are all expired keeps exactly one. Returns the number deleted.
    fn delete_older_than(&self, source: &str, cutoff: Timestamp) -> Result<usize, StorageError>;

    /// Number of records of `source` held for a subject.
    fn count(&self, source: &str, subject_id: &str) -> Result<usize, StorageError>;
}

/// `(subject_id, id)` of the records that may be deleted for `cutoff`, keeping
/// each subject's newest record when all of that subject's records are expired.
pub(crate) fn select_expired<'a, I>(records: I, cutoff: Timestamp) -> HashSet<(String, String)>
where
    I: IntoIterator<Item = &'a StoredRecord>,
{
    let mut by_subject: HashMap<&str, Vec<&StoredRecord>> = HashMap::new();
    for record in records {
        by_subject
            .entry(record.subject_id.as_str())
            .or_default()
            .push(record);
    }

    let mut expired = HashSet::new();
    for (_, mut records) in by_subject {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let all_expired = records.iter().all(|r| r.created_at < cutoff);
        let skip = if all_expired { 1 } else { 0 };
        for record in records.into_iter().skip(skip) {
            if record.created_at < cutoff {
                expired.insert(record.identity());
            }
        }
    }
    expired
}
