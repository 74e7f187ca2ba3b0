//! Per-fingerprint in-flight builds, so concurrent misses on one key can wait
//! for a single builder instead of rebuilding.

use crate::cache::fingerprint::ContextFingerprint;
use crate::context::CompositeContext;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

type Waiter = oneshot::Sender<Option<CompositeContext>>;

#[derive(Default)]
pub(crate) struct FlightGroup {
    inflight: Mutex<HashMap<ContextFingerprint, Vec<Waiter>>>,
}

pub(crate) enum Flight {
    /// This caller runs the builder and must complete the guard.
    Leader(FlightGuard),
    /// Another caller is building; `None` means it failed.
    Follower(oneshot::Receiver<Option<CompositeContext>>),
}

impl FlightGroup {
    pub(crate) fn join(self: &Arc<Self>, fingerprint: &ContextFingerprint) -> Flight {
        let mut inflight = self.inflight.lock();
        if let Some(waiters) = inflight.get_mut(fingerprint) {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            return Flight::Follower(rx);
        }
        inflight.insert(fingerprint.clone(), Vec::new());
        Flight::Leader(FlightGuard {
            group: Arc::clone(self),
            fingerprint: fingerprint.clone(),
            done: false,
        })
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    fn finish(&self, fingerprint: &ContextFingerprint, result: Option<&CompositeContext>) {
        let waiters = self.inflight.lock().remove(fingerprint).unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(result.cloned());
        }
    }
}

/// Held by the leader; dropping it without completing releases waiters with `None`.
pub(crate) struct FlightGuard {
    group: Arc<FlightGroup>,
    fingerprint: ContextFingerprint,
    done: bool,
}

impl FlightGuard {
    pub(crate) fn complete(mut self, result: Option<&CompositeContext>) {
        self.done = true;
        self.group.finish(&self.fingerprint, result);
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.done {
            self.group.finish(&self.fingerprint, None);
        }
    }
}
