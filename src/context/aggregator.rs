//! Context aggregator: pulls every requested source through the registry and
//! merges the results into one composite context in priority order.

use crate::context::types::{CompositeContext, ContextRequest, SubjectContext};
use crate::error::{ContextError, SourceLoadError};
use crate::source::{DataSourceDescriptor, DataSourceRegistry};
use crate::types::Record;
use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Aggregation settings.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Sources used when a request names none. Empty means every registered source.
    pub default_sources: Vec<String>,
    /// Maximum loader calls in flight for one aggregation.
    pub worker_pool_size: usize,
    /// Per-loader deadline.
    pub load_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_sources: Vec::new(),
            worker_pool_size: 4,
            load_timeout: Duration::from_millis(5000),
        }
    }
}

/// Outcome of a single loader call.
enum LoadOutcome {
    Loaded(Vec<Record>),
    Failed(SourceLoadError),
}

/// Loads a composite context from the registered sources.
pub struct ContextAggregator {
    registry: Arc<DataSourceRegistry>,
    config: AggregatorConfig,
}

impl ContextAggregator {
    pub fn new(registry: Arc<DataSourceRegistry>, config: AggregatorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DataSourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Names a request resolves to before priority sorting.
    fn requested_names(&self, request: &ContextRequest) -> Vec<String> {
        if !request.sources.is_empty() {
            request.sources.clone()
        } else if !self.config.default_sources.is_empty() {
            self.config.default_sources.clone()
        } else {
            self.registry.names()
        }
    }

    /// Load every requested source for the subject.
    ///
    /// Non-critical failures are returned alongside the context and their keys are
    /// left out of `scope_data`. A failing or empty critical source aborts with
    /// `SubjectNotFound`; an unregistered name aborts with `UnknownSource`.
    pub async fn load(
        &self,
        request: &ContextRequest,
    ) -> Result<(CompositeContext, Vec<SourceLoadError>), ContextError> {
        let descriptors = self.registry.resolve(&self.requested_names(request))?;
        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));

        let loads = descriptors.iter().map(|descriptor| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire_owned().await.ok();
                self.load_source(descriptor, request).await
            }
        });
        // join_all keeps input order, which is already priority order.
        let outcomes = join_all(loads).await;

        let mut context = CompositeContext {
            subject_context: SubjectContext {
                subject_id: request.subject_id.clone(),
                scope_kind: request.scope_kind.clone(),
                scope_id: request.scope_id.clone(),
                session_id: request.session_id.clone(),
                profile: None,
            },
            scope_data: IndexMap::with_capacity(descriptors.len()),
            ..Default::default()
        };
        let mut errors = Vec::new();

        for (descriptor, outcome) in descriptors.iter().zip(outcomes) {
            match outcome {
                LoadOutcome::Loaded(records) if descriptor.critical && records.is_empty() => {
                    return Err(self.critical_failure(request, descriptor, "no records"));
                }
                LoadOutcome::Loaded(records) => {
                    if descriptor.critical && context.subject_context.profile.is_none() {
                        context.subject_context.profile = records.first().cloned();
                    }
                    context.metadata.sources.push(descriptor.name.clone());
                    context.scope_data.insert(descriptor.name.clone(), records);
                }
                LoadOutcome::Failed(err) if descriptor.critical => {
                    return Err(self.critical_failure(request, descriptor, &err.message));
                }
                LoadOutcome::Failed(err) => {
                    warn!(
                        subject_id = %request.subject_id,
                        source = %descriptor.name,
                        kind = ?err.kind,
                        error = %err.message,
                        "Source failed to load; continuing with degraded context"
                    );
                    errors.push(err);
                }
            }
        }

        context.metadata.load_errors = errors.clone();
        Ok((context, errors))
    }

    async fn load_source(
        &self,
        descriptor: &DataSourceDescriptor,
        request: &ContextRequest,
    ) -> LoadOutcome {
        let start = Instant::now();
        let loader = descriptor.loader();
        let call = loader.load(
            &request.subject_id,
            request.scope_id.as_deref(),
            descriptor.max_items,
        );

        match tokio::time::timeout(self.config.load_timeout, call).await {
            Ok(Ok(mut records)) => {
                let fetched = records.len();
                records.truncate(descriptor.max_items);
                debug!(
                    source = %descriptor.name,
                    fetched,
                    kept = records.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Source loaded"
                );
                LoadOutcome::Loaded(records)
            }
            Ok(Err(e)) => LoadOutcome::Failed(SourceLoadError::failed(&descriptor.name, e.to_string())),
            Err(_) => LoadOutcome::Failed(SourceLoadError::timed_out(
                &descriptor.name,
                self.config.load_timeout.as_millis() as u64,
            )),
        }
    }

    fn critical_failure(
        &self,
        request: &ContextRequest,
        descriptor: &DataSourceDescriptor,
        reason: &str,
    ) -> ContextError {
        error!(
            subject_id = %request.subject_id,
            source = %descriptor.name,
            reason = %reason,
            "Critical source failed; aborting aggregation"
        );
        ContextError::SubjectNotFound {
            subject_id: request.subject_id.clone(),
            source_name: descriptor.name.clone(),
            reason: reason.to_string(),
        }
    }
}
