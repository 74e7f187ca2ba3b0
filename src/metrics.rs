//! Metrics reporter: cache hit/miss counters and per-build timings.

use crate::cache::{CacheStats, ContextFingerprint};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const RECENT_BUILDS: usize = 256;

/// Timing of one context build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTiming {
    pub fingerprint: String,
    pub version: u64,
    pub duration_ms: u64,
    pub truncated: bool,
    pub failed_sources: usize,
}

/// Counter and timing snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub build_failures: u64,
    pub invalidated: u64,
    pub swept: u64,
    pub average_build_ms: f64,
    pub recent_builds: Vec<BuildTiming>,
}

/// Cache statistics plus metrics, as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub metrics: MetricsSnapshot,
}

#[derive(Default)]
pub struct MetricsReporter {
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    build_failures: AtomicU64,
    invalidated: AtomicU64,
    swept: AtomicU64,
    recent: Mutex<VecDeque<BuildTiming>>,
}

impl MetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build(
        &self,
        fingerprint: &ContextFingerprint,
        version: u64,
        duration: Duration,
        truncated: bool,
        failed_sources: usize,
    ) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        let mut recent = self.recent.lock();
        if recent.len() == RECENT_BUILDS {
            recent.pop_front();
        }
        recent.push_back(BuildTiming {
            fingerprint: fingerprint.to_string(),
            version,
            duration_ms: duration.as_millis() as u64,
            truncated,
            failed_sources,
        });
    }

    pub fn record_build_failure(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self, count: usize) {
        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let recent: Vec<BuildTiming> = self.recent.lock().iter().cloned().collect();
        let average_build_ms = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|t| t.duration_ms as f64).sum::<f64>() / recent.len() as f64
        };
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            average_build_ms,
            recent_builds: recent,
        }
    }
}
