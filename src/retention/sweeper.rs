//! Retention sweeper: deletes aged upstream records per policy, then evicts
//! expired cache entries and idle conversation windows. Runs once on demand or
//! on a fixed interval.

use crate::cache::ContextCache;
use crate::clock::Clock;
use crate::context::ConversationLog;
use crate::metrics::MetricsReporter;
use crate::retention::policy::RetentionPolicy;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Daily.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Records deleted per source.
    pub deleted: BTreeMap<String, usize>,
    /// Sources whose deletion failed, with the error text.
    pub failures: BTreeMap<String, String>,
    pub cache_evicted: usize,
    /// Conversation windows dropped for inactivity.
    #[serde(default)]
    pub sessions_evicted: usize,
}

impl SweepReport {
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }
}

pub struct RetentionSweeper {
    store: Arc<dyn RecordStore>,
    cache: Arc<ContextCache>,
    policy: RetentionPolicy,
    interval: Duration,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<MetricsReporter>>,
    conversations: Option<(Arc<ConversationLog>, chrono::Duration)>,
}

impl RetentionSweeper {
    /// The sweeper reads time from the cache's clock so both agree on "now".
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<ContextCache>,
        policy: RetentionPolicy,
        interval: Duration,
    ) -> Self {
        let clock = cache.clock();
        Self {
            store,
            cache,
            policy,
            interval,
            clock,
            metrics: None,
            conversations: None,
        }
    }

    /// Also drop conversation windows idle for longer than `idle`, along with
    /// their cached contexts.
    pub fn with_conversations(mut self, log: Arc<ConversationLog>, idle: Duration) -> Self {
        let idle = chrono::Duration::from_std(idle).unwrap_or(chrono::Duration::MAX);
        self.conversations = Some((log, idle));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsReporter>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Run one sweep. Each source is swept independently; a failing source is
    /// logged and recorded without stopping the others.
    pub fn sweep_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for (source, max_age_days) in self.policy.iter() {
            let cutoff = RetentionPolicy::cutoff(now, max_age_days);
            match self.store.delete_older_than(source, cutoff) {
                Ok(count) => {
                    debug!(source = %source, max_age_days, deleted = count, "Retention applied");
                    report.deleted.insert(source.to_string(), count);
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Retention sweep failed for source");
                    report.failures.insert(source.to_string(), e.to_string());
                }
            }
        }

        report.cache_evicted = self.cache.sweep_expired();
        if let Some((log, idle)) = &self.conversations {
            let cutoff = now.checked_sub_signed(*idle).unwrap_or(DateTime::<Utc>::MIN_UTC);
            for session_id in log.evict_idle(cutoff) {
                self.cache.invalidate_session(&session_id);
                report.sessions_evicted += 1;
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_swept(report.cache_evicted);
        }

        info!(
            deleted = report.total_deleted(),
            failed_sources = report.failures.len(),
            cache_evicted = report.cache_evicted,
            sessions_evicted = report.sessions_evicted,
            "Retention sweep completed"
        );
        report
    }

    /// Run on a fixed interval until the handle is shut down. The first sweep
    /// happens one interval after start.
    pub fn spawn(self) -> SweeperHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        let period = self.interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "Retention sweeper started");
            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                }
            }
            info!("Retention sweeper stopped");
        });

        SweeperHandle { shutdown, handle }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its task to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
