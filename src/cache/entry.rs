//! Cache entry: the last built context for a fingerprint plus build metadata.

use crate::context::CompositeContext;
use crate::types::Timestamp;
use chrono::Duration;

/// Replaced wholesale on rebuild; never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub context: CompositeContext,
    pub built_at: Timestamp,
    pub version: u64,
}

/// Freshness of an entry relative to a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Fresh,
    Stale,
}

impl CacheEntry {
    pub fn state(&self, now: Timestamp, ttl: Duration) -> EntryState {
        if now - self.built_at < ttl {
            EntryState::Fresh
        } else {
            EntryState::Stale
        }
    }

    pub fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        self.state(now, ttl) == EntryState::Fresh
    }

    /// The stored context annotated as served from cache.
    pub fn cached_context(&self) -> CompositeContext {
        let mut context = self.context.clone();
        context.metadata.cached = true;
        context
    }
}
