//! Store-backed loader: serves one source's records out of a RecordStore.

use crate::error::ContextError;
use crate::source::DataSourceLoader;
use crate::store::RecordStore;
use crate::types::Record;
use async_trait::async_trait;
use std::sync::Arc;

/// Loader reading the newest records of one source from a record store.
pub struct StoreLoader {
    source: String,
    store: Arc<dyn RecordStore>,
}

impl StoreLoader {
    pub fn new(source: impl Into<String>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            source: source.into(),
            store,
        }
    }
}

#[async_trait]
impl DataSourceLoader for StoreLoader {
    async fn load(
        &self,
        subject_id: &str,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Record>, ContextError> {
        let records = self.store.list(&self.source, subject_id, scope_id, limit)?;
        Ok(records.into_iter().map(|r| r.payload).collect())
    }
}
