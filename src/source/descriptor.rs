//! Source descriptor and the loader port implemented by collaborators.

use crate::error::ContextError;
use crate::types::Record;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Loads one category of records for a subject.
///
/// `limit` is a hint; the aggregator truncates to the descriptor's `max_items`
/// regardless of how many records come back.
#[async_trait]
pub trait DataSourceLoader: Send + Sync {
    async fn load(
        &self,
        subject_id: &str,
        scope_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Record>, ContextError>;
}

/// Adapter turning a plain closure into a loader.
pub struct FnLoader<F> {
    f: F,
}

impl<F> FnLoader<F>
where
    F: Fn(&str, Option<&str>) -> Result<Vec<Record>, ContextError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> DataSourceLoader for FnLoader<F>
where
    F: Fn(&str, Option<&str>) -> Result<Vec<Record>, ContextError> + Send + Sync,
{
    async fn load(
        &self,
        subject_id: &str,
        scope_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<Record>, ContextError> {
        (self.f)(subject_id, scope_id)
    }
}

/// A named loader with its priority (higher loads first) and per-load item cap.
#[derive(Clone)]
pub struct DataSourceDescriptor {
    pub name: String,
    pub priority: i32,
    pub max_items: usize,
    /// A failing critical source aborts the whole aggregation.
    pub critical: bool,
    loader: Arc<dyn DataSourceLoader>,
}

impl DataSourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        max_items: usize,
        loader: Arc<dyn DataSourceLoader>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            max_items,
            critical: false,
            loader,
        }
    }

    /// Mark this source as critical.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn loader(&self) -> Arc<dyn DataSourceLoader> {
        Arc::clone(&self.loader)
    }
}

impl fmt::Debug for DataSourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("max_items", &self.max_items)
            .field("critical", &self.critical)
            .finish()
    }
}
