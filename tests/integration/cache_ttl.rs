//! Integration tests for cache freshness, invalidation and sweeping

use crate::integration::test_utils::records;
use async_trait::async_trait;
use mentorctx::clock::ManualClock;
use mentorctx::config::EngineConfig;
use mentorctx::error::ContextError;
use mentorctx::source::{DataSourceDescriptor, DataSourceLoader, DataSourceRegistry, FnLoader};
use mentorctx::types::Record;
use mentorctx::{ContextService, Role};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Loader whose first call parks until released. Each call returns the
/// upstream version it observed.
struct GatedLoader {
    calls: AtomicUsize,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl DataSourceLoader for GatedLoader {
    async fn load(
        &self,
        _subject_id: &str,
        _scope_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<Record>, ContextError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(vec![json!({ "id": format!("v{}", call) })])
    }
}

fn counted_service(calls: &Arc<AtomicUsize>, clock: &Arc<ManualClock>) -> ContextService {
    let calls = Arc::clone(calls);
    let mut registry = DataSourceRegistry::new();
    registry
        .register(DataSourceDescriptor::new(
            "tasks",
            1,
            10,
            Arc::new(FnLoader::new(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(records("task", 3))
            })),
        ))
        .unwrap();
    ContextService::from_config(&EngineConfig::default(), Arc::new(registry), clock.clone())
}

#[tokio::test]
async fn test_builder_runs_once_within_ttl_and_again_after() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(ManualClock::starting_now());
    let service = counted_service(&calls, &clock);

    let first = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    clock.advance(chrono::Duration::seconds(120));
    let second = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(second.metadata.cached);
    assert_eq!(second.metadata.version, first.metadata.version);

    clock.advance(chrono::Duration::seconds(180));
    let third = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!third.metadata.cached);
    assert!(third.metadata.version > first.metadata.version);
}

#[tokio::test]
async fn test_fingerprints_are_independent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(ManualClock::starting_now());
    let service = counted_service(&calls, &clock);

    service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    service.build_context("u1", "quest", "s1", &[]).await.unwrap();
    service.build_context("u2", "mentor", "s1", &[]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let stats = service.stats();
    assert_eq!(stats.cache.entry_count, 3);
    assert_eq!(
        stats.cache.fingerprints,
        vec!["u1:mentor:s1", "u1:quest:s1", "u2:mentor:s1"]
    );
}

#[tokio::test]
async fn test_invalidate_subject_only_touches_that_subject() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(ManualClock::starting_now());
    let service = counted_service(&calls, &clock);

    service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    service.build_context("u1", "quest", "s2", &[]).await.unwrap();
    service.build_context("u2", "mentor", "s3", &[]).await.unwrap();

    assert_eq!(service.invalidate_subject("u1"), 2);
    assert_eq!(service.stats().cache.fingerprints, vec!["u2:mentor:s3"]);

    let u2 = service.build_context("u2", "mentor", "s3", &[]).await.unwrap();
    assert!(u2.metadata.cached);
}

#[tokio::test]
async fn test_sweep_expired_removes_only_stale_entries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(ManualClock::starting_now());
    let service = counted_service(&calls, &clock);

    service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    clock.advance(chrono::Duration::minutes(4));
    service.build_context("u2", "mentor", "s1", &[]).await.unwrap();
    clock.advance(chrono::Duration::minutes(1));

    assert_eq!(service.cache().sweep_expired(), 1);
    assert_eq!(service.cache().sweep_expired(), 0);
    assert_eq!(service.stats().cache.fingerprints, vec!["u2:mentor:s1"]);
}

#[tokio::test]
async fn test_concurrent_builds_on_cold_entry_both_succeed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(ManualClock::starting_now());
    let service = Arc::new(counted_service(&calls, &clock));

    let a = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.build_context("u1", "mentor", "s1", &[]).await })
    };
    let b = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.build_context("u1", "mentor", "s1", &[]).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.scope_data, b.scope_data);
    assert_eq!(service.cache().len(), 1);
    let builds = calls.load(Ordering::SeqCst);
    assert!((1..=2).contains(&builds));
}

#[tokio::test]
async fn test_invalidation_during_build_is_not_served_from_cache() {
    let loader = Arc::new(GatedLoader {
        calls: AtomicUsize::new(0),
        entered: Arc::new(Notify::new()),
        release: Arc::new(Notify::new()),
    });
    let mut registry = DataSourceRegistry::new();
    registry
        .register(DataSourceDescriptor::new("tasks", 1, 10, loader.clone()))
        .unwrap();
    let service = Arc::new(ContextService::from_config(
        &EngineConfig::default(),
        Arc::new(registry),
        Arc::new(ManualClock::starting_now()),
    ));

    let in_flight = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.build_context("u1", "mentor", "s1", &[]).await })
    };

    loader.entered.notified().await;
    assert_eq!(service.invalidate_subject("u1"), 0);
    service.record_turn("s1", Role::User, "I finished the outline");
    loader.release.notify_one();

    let stale = in_flight.await.unwrap().unwrap();
    assert_eq!(stale.scope_data["tasks"][0]["id"], "v0");
    assert!(!stale.metadata.cached);
    assert!(service.cache().is_empty());

    let fresh = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert!(!fresh.metadata.cached);
    assert_eq!(fresh.scope_data["tasks"][0]["id"], "v1");
    assert_eq!(fresh.conversation.len(), 1);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}
