//! Context cache: TTL-bounded store of the last built context per fingerprint.
//!
//! Entries move `Absent -> Fresh -> Stale -> Absent`. Reads take a shared lock and
//! never block each other. Concurrent misses on one fingerprint both build and the
//! last write wins, unless build coalescing is enabled.
//!
//! Every build in progress holds a ticket. Invalidating a subject or session
//! marks the matching tickets, and a marked build is returned to its caller but
//! never stored.

mod entry;
mod fingerprint;
mod flight;

pub use entry::{CacheEntry, EntryState};
pub use fingerprint::ContextFingerprint;

use crate::clock::{Clock, SystemClock};
use crate::context::CompositeContext;
use crate::error::ContextError;
use flight::{Flight, FlightGroup};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default entry lifetime: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// Let concurrent misses on one fingerprint share a single build.
    pub coalesce_builds: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            coalesce_builds: false,
        }
    }
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub ttl_secs: u64,
    /// Sorted for stable output.
    pub fingerprints: Vec<String>,
}

/// Shared, injected context cache.
pub struct ContextCache {
    entries: RwLock<HashMap<ContextFingerprint, CacheEntry>>,
    settings: CacheSettings,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    /// Strictly increasing across rebuilds of any fingerprint.
    next_version: AtomicU64,
    flights: Option<Arc<FlightGroup>>,
    /// Builds in progress, keyed by ticket.
    pending: Mutex<HashMap<u64, PendingBuild>>,
    next_ticket: AtomicU64,
}

struct PendingBuild {
    fingerprint: ContextFingerprint,
    invalidated: bool,
}

/// Registration of one build in progress. Dropping it deregisters the build.
struct BuildTicket<'a> {
    cache: &'a ContextCache,
    id: u64,
}

impl Drop for BuildTicket<'_> {
    fn drop(&mut self) {
        self.cache.pending.lock().remove(&self.id);
    }
}

impl ContextCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(settings.ttl).unwrap_or(chrono::Duration::MAX);
        let flights = settings
            .coalesce_builds
            .then(|| Arc::new(FlightGroup::default()));
        Self {
            entries: RwLock::new(HashMap::new()),
            settings,
            ttl,
            clock,
            next_version: AtomicU64::new(1),
            flights,
            pending: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Fresh context for a fingerprint, annotated `cached = true`.
    pub fn get(&self, fingerprint: &ContextFingerprint) -> Option<CompositeContext> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(fingerprint)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(CacheEntry::cached_context)
    }

    /// Freshness of an entry, `None` when absent.
    pub fn state(&self, fingerprint: &ContextFingerprint) -> Option<EntryState> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(fingerprint)
            .map(|entry| entry.state(now, self.ttl))
    }

    /// Serve a fresh entry, or run `builder` and store what it returns.
    ///
    /// Builder errors are returned as-is and leave the cache untouched.
    pub async fn get_or_build<F, Fut>(
        &self,
        fingerprint: &ContextFingerprint,
        builder: F,
    ) -> Result<CompositeContext, ContextError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompositeContext, ContextError>>,
    {
        if let Some(context) = self.get(fingerprint) {
            debug!(fingerprint = %fingerprint, "Context cache hit");
            return Ok(context);
        }

        let Some(flights) = &self.flights else {
            let (context, _) = self.build_and_store(fingerprint, builder).await?;
            return Ok(context);
        };

        match flights.join(fingerprint) {
            Flight::Leader(guard) => match self.build_and_store(fingerprint, builder).await {
                Ok((context, stored)) => {
                    let mut shared = context.clone();
                    shared.metadata.cached = stored;
                    guard.complete(Some(&shared));
                    Ok(context)
                }
                Err(e) => {
                    guard.complete(None);
                    Err(e)
                }
            },
            Flight::Follower(rx) => match rx.await {
                Ok(Some(context)) => {
                    debug!(fingerprint = %fingerprint, "Joined in-flight context build");
                    Ok(context)
                }
                // Leader failed or was cancelled: build independently.
                _ => {
                    let (context, _) = self.build_and_store(fingerprint, builder).await?;
                    Ok(context)
                }
            },
        }
    }

    /// Run `builder` under a ticket and store the result unless the fingerprint
    /// was invalidated meanwhile. The flag reports whether it was stored.
    async fn build_and_store<F, Fut>(
        &self,
        fingerprint: &ContextFingerprint,
        builder: F,
    ) -> Result<(CompositeContext, bool), ContextError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompositeContext, ContextError>>,
    {
        let ticket = self.begin_build(fingerprint);
        let context = builder().await?;
        Ok(self.commit(&ticket, fingerprint, context))
    }

    fn begin_build(&self, fingerprint: &ContextFingerprint) -> BuildTicket<'_> {
        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().insert(
            id,
            PendingBuild {
                fingerprint: fingerprint.clone(),
                invalidated: false,
            },
        );
        BuildTicket { cache: self, id }
    }

    fn commit(
        &self,
        ticket: &BuildTicket<'_>,
        fingerprint: &ContextFingerprint,
        mut context: CompositeContext,
    ) -> (CompositeContext, bool) {
        // Entries lock first, as in `remove_where`, so an invalidation is either
        // seen here or removes what is stored here.
        let mut entries = self.entries.write();
        let invalidated = self
            .pending
            .lock()
            .remove(&ticket.id)
            .map_or(true, |pending| pending.invalidated);

        if invalidated {
            let (built_at, version) = self.stamp(&mut context);
            debug!(
                fingerprint = %fingerprint,
                version,
                built_at = %built_at,
                "Build invalidated while in flight; not cached"
            );
            return (context, false);
        }
        (self.store_locked(&mut entries, fingerprint, context), true)
    }

    fn stamp(&self, context: &mut CompositeContext) -> (crate::types::Timestamp, u64) {
        let built_at = self.clock.now();
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        context.metadata.cached = false;
        context.metadata.version = version;
        context.metadata.built_at = Some(built_at);
        (built_at, version)
    }

    /// Store a freshly built context with `built_at = now` and the next version.
    /// Returns the stored context (`cached = false`).
    pub fn insert(
        &self,
        fingerprint: &ContextFingerprint,
        context: CompositeContext,
    ) -> CompositeContext {
        let mut entries = self.entries.write();
        self.store_locked(&mut entries, fingerprint, context)
    }

    fn store_locked(
        &self,
        entries: &mut HashMap<ContextFingerprint, CacheEntry>,
        fingerprint: &ContextFingerprint,
        mut context: CompositeContext,
    ) -> CompositeContext {
        let (built_at, version) = self.stamp(&mut context);
        let entry = CacheEntry {
            context: context.clone(),
            built_at,
            version,
        };
        entries.insert(fingerprint.clone(), entry);
        info!(
            fingerprint = %fingerprint,
            version,
            truncated = context.metadata.truncated,
            degraded = !context.metadata.load_errors.is_empty(),
            "Context rebuilt"
        );
        context
    }

    /// Remove every entry for a subject. Returns how many were removed.
    pub fn invalidate(&self, subject_id: &str) -> usize {
        self.remove_where(|fp| fp.subject_id == subject_id)
    }

    /// Remove every entry for a session.
    pub fn invalidate_session(&self, session_id: &str) -> usize {
        self.remove_where(|fp| fp.session_id == session_id)
    }

    /// Remove one fingerprint.
    pub fn remove(&self, fingerprint: &ContextFingerprint) -> bool {
        self.remove_where(|fp| fp == fingerprint) > 0
    }

    /// Evict every entry at or past its TTL. Idempotent.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, ttl));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = entries.len(), "Swept expired context entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.remove_where(|_| true);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut fingerprints: Vec<String> = entries.keys().map(|fp| fp.to_string()).collect();
        fingerprints.sort();
        CacheStats {
            entry_count: entries.len(),
            ttl_secs: self.settings.ttl.as_secs(),
            fingerprints,
        }
    }

    fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&ContextFingerprint) -> bool,
    {
        let mut entries = self.entries.write();
        for pending in self.pending.lock().values_mut() {
            if predicate(&pending.fingerprint) {
                pending.invalidated = true;
            }
        }
        let before = entries.len();
        entries.retain(|fp, _| !predicate(fp));
        before - entries.len()
    }
}
