//! Context service: the caller-facing entry point.
//!
//! Ties the aggregator, conversation log, compressor and cache together. A build
//! is served from the cache when fresh; otherwise sources are loaded, the
//! session's recent turns are merged in, and the result is compressed to the
//! size budget before it is stored.

use crate::cache::{ContextCache, ContextFingerprint};
use crate::clock::Clock;
use crate::config::{EngineConfig, RetentionConfig};
use crate::context::{
    CompositeContext, ContextAggregator, ContextCompressor, ContextRequest, ConversationLog, Role,
    Turn,
};
use crate::error::ContextError;
use crate::metrics::{MetricsReporter, StatsReport};
use crate::retention::RetentionSweeper;
use crate::source::DataSourceRegistry;
use crate::store::RecordStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

pub struct ContextService {
    aggregator: ContextAggregator,
    cache: Arc<ContextCache>,
    conversations: Arc<ConversationLog>,
    compressor: ContextCompressor,
    metrics: Arc<MetricsReporter>,
    conversation_idle: Duration,
}

impl ContextService {
    pub fn new(
        aggregator: ContextAggregator,
        cache: Arc<ContextCache>,
        conversations: Arc<ConversationLog>,
        compressor: ContextCompressor,
    ) -> Self {
        Self {
            aggregator,
            cache,
            conversations,
            compressor,
            metrics: Arc::new(MetricsReporter::new()),
            conversation_idle: Duration::from_secs(60 * 60 * 24),
        }
    }

    /// Wire every component from configuration around an already-populated registry.
    pub fn from_config(
        config: &EngineConfig,
        registry: Arc<DataSourceRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let aggregator =
            ContextAggregator::new(registry, config.aggregation.aggregator_config());
        let cache = Arc::new(ContextCache::with_clock(config.cache.settings(), clock));
        let conversations = Arc::new(ConversationLog::new(config.conversation.max_turns));
        let compressor = ContextCompressor::new(config.cache.budget_bytes);
        Self::new(aggregator, cache, conversations, compressor)
            .with_conversation_idle(config.conversation.idle_timeout())
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsReporter>) -> Self {
        self.metrics = metrics;
        self
    }

    /// How long a session may go without a turn before the sweeper drops it.
    pub fn with_conversation_idle(mut self, idle: Duration) -> Self {
        self.conversation_idle = idle;
        self
    }

    /// Build (or serve from cache) the context for one fingerprint.
    ///
    /// `sources` empty means the configured default set. Only `UnknownSource`
    /// and `SubjectNotFound` are returned as errors; anything else degrades the
    /// context and is reported in its metadata.
    pub async fn build_context(
        &self,
        subject_id: &str,
        scope_kind: &str,
        session_id: &str,
        sources: &[String],
    ) -> Result<CompositeContext, ContextError> {
        let request = ContextRequest::new(subject_id, scope_kind, session_id)
            .with_sources(sources.iter().cloned());
        self.build(&request).await
    }

    #[instrument(skip(self, request), fields(subject_id = %request.subject_id, session_id = %request.session_id))]
    pub async fn build(&self, request: &ContextRequest) -> Result<CompositeContext, ContextError> {
        let fingerprint = ContextFingerprint::for_request(request);

        let result = self
            .cache
            .get_or_build(&fingerprint, || self.assemble(request))
            .await;

        match &result {
            Ok(context) if context.metadata.cached => self.metrics.record_hit(),
            Ok(context) => {
                self.metrics.record_miss();
                self.metrics.record_build(
                    &fingerprint,
                    context.metadata.version,
                    Duration::from_millis(context.metadata.build_ms),
                    context.metadata.truncated,
                    context.metadata.load_errors.len(),
                );
            }
            Err(_) => {
                self.metrics.record_miss();
                self.metrics.record_build_failure();
            }
        }
        result
    }

    async fn assemble(&self, request: &ContextRequest) -> Result<CompositeContext, ContextError> {
        let start = Instant::now();
        let (mut context, _) = self.aggregator.load(request).await?;
        context.conversation = self
            .conversations
            .history(&request.session_id, self.conversations.max_turns());

        let mut context = self.compressor.compress(context);
        context.metadata.build_ms = start.elapsed().as_millis() as u64;
        Ok(context)
    }

    /// Drop every cached context for a subject after upstream data changed.
    pub fn invalidate_subject(&self, subject_id: &str) -> usize {
        let removed = self.cache.invalidate(subject_id);
        self.metrics.record_invalidated(removed);
        info!(subject_id = %subject_id, removed, "Subject invalidated");
        removed
    }

    /// Append a dialogue turn to a session's window. The session's cached
    /// contexts are dropped so the next build includes the turn.
    pub fn record_turn(&self, session_id: &str, role: Role, content: impl Into<String>) -> Turn {
        let turn = Turn::new(role, content, self.cache.clock().now());
        self.conversations.record(session_id, turn.clone());
        let removed = self.cache.invalidate_session(session_id);
        self.metrics.record_invalidated(removed);
        turn
    }

    /// End a session: drop its conversation window and its cached contexts.
    /// Returns whether a window existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        let existed = self.conversations.clear_session(session_id);
        let removed = self.cache.invalidate_session(session_id);
        self.metrics.record_invalidated(removed);
        info!(session_id = %session_id, existed, removed, "Session cleared");
        existed
    }

    pub fn stats(&self) -> StatsReport {
        StatsReport {
            cache: self.cache.stats(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// A sweeper over `store` that shares this service's cache, conversation
    /// log and metrics.
    pub fn retention_sweeper(
        &self,
        store: Arc<dyn RecordStore>,
        config: &RetentionConfig,
    ) -> RetentionSweeper {
        RetentionSweeper::new(
            store,
            Arc::clone(&self.cache),
            config.policies.clone(),
            config.interval(),
        )
        .with_metrics(Arc::clone(&self.metrics))
        .with_conversations(Arc::clone(&self.conversations), self.conversation_idle)
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    pub fn conversations(&self) -> &Arc<ConversationLog> {
        &self.conversations
    }

    pub fn metrics(&self) -> &Arc<MetricsReporter> {
        &self.metrics
    }

    pub fn registry(&self) -> &DataSourceRegistry {
        self.aggregator.registry()
    }
}
