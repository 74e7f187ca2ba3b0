//! Persistence layer for upstream records.

use crate::error::{to_storage_data, to_storage_io, StorageError};
use crate::store::{select_expired, RecordStore, StoredRecord};
use crate::types::Timestamp;
use sled::{Db, Tree};
use std::path::Path;

const TREE_RECORDS: &str = "records";
const TIME_KEY_PAD: usize = 20;

/// Sled-based implementation of RecordStore.
///
/// Keys are `source \0 subject \0 created_at_ms \0 id`, so a prefix scan over
/// one subject yields records in creation order.
#[derive(Clone)]
pub struct SledRecordStore {
    db: Db,
    records: Tree,
}

impl SledRecordStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let records = db.open_tree(TREE_RECORDS).map_err(to_storage_io)?;
        Ok(Self { db, records })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(sled::IVec, StoredRecord)>, StorageError> {
        let mut out = Vec::new();
        for result in self.records.scan_prefix(prefix.as_bytes()) {
            let (key, value) = result.map_err(to_storage_io)?;
            let record: StoredRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push((key, record));
        }
        Ok(out)
    }
}

fn source_prefix(source: &str) -> String {
    format!("{}\0", source)
}

fn subject_prefix(source: &str, subject_id: &str) -> String {
    format!("{}\0{}\0", source, subject_id)
}

fn encode_key(record: &StoredRecord) -> String {
    let millis = record.created_at.timestamp_millis().max(0) as u64;
    format!(
        "{}{:0width$}\0{}",
        subject_prefix(&record.source, &record.subject_id),
        millis,
        record.id,
        width = TIME_KEY_PAD
    )
}

impl RecordStore for SledRecordStore {
    fn put(&self, record: &StoredRecord) -> Result<(), StorageError> {
        // Same id may have been stored under an older timestamp.
        for (key, existing) in self.scan(&subject_prefix(&record.source, &record.subject_id))? {
            if existing.id == record.id {
                self.records.remove(key).map_err(to_storage_io)?;
            }
        }
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.records
            .insert(encode_key(record).as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn list(
        &self,
        source: &str,
        subject_id: &str,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        let mut out: Vec<StoredRecord> = self
            .scan(&subject_prefix(source, subject_id))?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|r| r.matches_scope(scope_id))
            .collect();
        out.reverse();
        out.truncate(limit);
        Ok(out)
    }

    fn delete_older_than(&self, source: &str, cutoff: Timestamp) -> Result<usize, StorageError> {
        let entries = self.scan(&source_prefix(source))?;
        let expired = select_expired(entries.iter().map(|(_, r)| r), cutoff);
        let mut removed = 0usize;
        for (key, record) in &entries {
            if expired.contains(&record.identity()) {
                self.records.remove(key).map_err(to_storage_io)?;
                removed += 1;
            }
        }
        self.flush()?;
        Ok(removed)
    }

    fn count(&self, source: &str, subject_id: &str) -> Result<usize, StorageError> {
        Ok(self
            .records
            .scan_prefix(subject_prefix(source, subject_id).as_bytes())
            .count())
    }
}
