//! In-memory record store.

use crate::error::StorageError;
use crate::store::{select_expired, RecordStore, StoredRecord};
use crate::types::Timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Record store held entirely in memory, keyed by source.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, record: &StoredRecord) -> Result<(), StorageError> {
        let mut records = self.records.write();
        let bucket = records.entry(record.source.clone()).or_default();
        bucket.retain(|r| !(r.subject_id == record.subject_id && r.id == record.id));
        bucket.push(record.clone());
        Ok(())
    }

    fn list(
        &self,
        source: &str,
        subject_id: &str,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        let records = self.records.read();
        let Some(bucket) = records.get(source) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<StoredRecord> = bucket
            .iter()
            .filter(|r| r.subject_id == subject_id && r.matches_scope(scope_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        out.truncate(limit);
        Ok(out)
    }

    fn delete_older_than(&self, source: &str, cutoff: Timestamp) -> Result<usize, StorageError> {
        let mut records = self.records.write();
        let Some(bucket) = records.get_mut(source) else {
            return Ok(0);
        };
        let expired = select_expired(bucket.iter(), cutoff);
        let before = bucket.len();
        bucket.retain(|r| !expired.contains(&r.identity()));
        Ok(before - bucket.len())
    }

    fn count(&self, source: &str, subject_id: &str) -> Result<usize, StorageError> {
        Ok(self
            .records
            .read()
            .get(source)
            .map(|bucket| bucket.iter().filter(|r| r.subject_id == subject_id).count())
            .unwrap_or(0))
    }
}
