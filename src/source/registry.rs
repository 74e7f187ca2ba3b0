//! Source registry: name-keyed set of descriptors, resolved in priority order.

use crate::config::SourceConfig;
use crate::error::ContextError;
use crate::source::descriptor::DataSourceDescriptor;
use crate::store::{RecordStore, StoreLoader};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of data sources.
///
/// Populated once at startup and then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct DataSourceRegistry {
    sources: HashMap<String, DataSourceDescriptor>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. Names are unique.
    pub fn register(&mut self, descriptor: DataSourceDescriptor) -> Result<(), ContextError> {
        if self.sources.contains_key(&descriptor.name) {
            return Err(ContextError::DuplicateSource(descriptor.name));
        }
        debug!(
            source = %descriptor.name,
            priority = descriptor.priority,
            max_items = descriptor.max_items,
            critical = descriptor.critical,
            "Registered data source"
        );
        self.sources.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Remove a source by name.
    pub fn unregister(&mut self, name: &str) -> Option<DataSourceDescriptor> {
        self.sources.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&DataSourceDescriptor> {
        self.sources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve names to descriptors sorted by descending priority.
    ///
    /// Equal priorities fall back to name order so resolution is deterministic.
    /// Repeated names resolve once.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<DataSourceDescriptor>, ContextError> {
        let mut resolved: Vec<DataSourceDescriptor> = Vec::with_capacity(names.len());
        for name in names {
            let descriptor = self
                .sources
                .get(name)
                .ok_or_else(|| ContextError::UnknownSource(name.clone()))?;
            if !resolved.iter().any(|d| d.name == descriptor.name) {
                resolved.push(descriptor.clone());
            }
        }
        sort_by_priority(&mut resolved);
        Ok(resolved)
    }

    /// All registered descriptors in priority order.
    pub fn list_all(&self) -> Vec<&DataSourceDescriptor> {
        let mut all: Vec<&DataSourceDescriptor> = self.sources.values().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        all
    }

    /// All registered names in priority order.
    pub fn names(&self) -> Vec<String> {
        self.list_all().into_iter().map(|d| d.name.clone()).collect()
    }

    /// Register one store-backed loader per configured source.
    pub fn load_from_config(
        &mut self,
        sources: &HashMap<String, SourceConfig>,
        store: Arc<dyn RecordStore>,
    ) -> Result<(), ContextError> {
        for (name, source_config) in sources {
            let loader = Arc::new(StoreLoader::new(name.clone(), Arc::clone(&store)));
            let mut descriptor = DataSourceDescriptor::new(
                name.clone(),
                source_config.priority,
                source_config.max_items,
                loader,
            );
            if source_config.critical {
                descriptor = descriptor.critical();
            }
            self.register(descriptor)?;
        }
        Ok(())
    }
}

pub(crate) fn sort_by_priority(descriptors: &mut [DataSourceDescriptor]) {
    descriptors.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
}
