//! Integration tests for the retention sweeper against durable storage

use mentorctx::cache::{CacheSettings, ContextCache, ContextFingerprint};
use mentorctx::clock::{Clock, ManualClock};
use mentorctx::context::CompositeContext;
use mentorctx::retention::{RetentionPolicy, RetentionSweeper, DEFAULT_SWEEP_INTERVAL};
use mentorctx::store::{RecordStore, SledRecordStore, StoredRecord};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn record(source: &str, subject: &str, id: &str, age_days: i64, clock: &ManualClock) -> StoredRecord {
    StoredRecord::new(
        source,
        subject,
        None,
        clock.now() - chrono::Duration::days(age_days),
        json!({ "id": id }),
    )
}

fn setup() -> (TempDir, Arc<SledRecordStore>, Arc<ManualClock>, Arc<ContextCache>) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledRecordStore::new(temp_dir.path()).unwrap());
    let clock = Arc::new(ManualClock::starting_now());
    let cache = Arc::new(ContextCache::with_clock(CacheSettings::default(), clock.clone()));
    (temp_dir, store, clock, cache)
}

#[test]
fn test_zero_day_policy_keeps_last_session() {
    let (_dir, store, clock, cache) = setup();
    store.put(&record("sessions", "u1", "s-only", 10, &clock)).unwrap();

    let sweeper = RetentionSweeper::new(
        store.clone(),
        cache,
        RetentionPolicy::new().with_source("sessions", 0),
        DEFAULT_SWEEP_INTERVAL,
    );
    let report = sweeper.sweep_once();

    assert_eq!(report.deleted["sessions"], 0);
    assert_eq!(store.count("sessions", "u1").unwrap(), 1);
}

#[test]
fn test_old_records_deleted_newest_kept() {
    let (_dir, store, clock, cache) = setup();
    store.put(&record("sessions", "u1", "s1", 120, &clock)).unwrap();
    store.put(&record("sessions", "u1", "s2", 100, &clock)).unwrap();
    store.put(&record("sessions", "u1", "s3", 95, &clock)).unwrap();
    store.put(&record("sessions", "u2", "s4", 5, &clock)).unwrap();
    store.put(&record("sessions", "u2", "s5", 200, &clock)).unwrap();
    store.put(&record("tasks", "u1", "t1", 365, &clock)).unwrap();

    let sweeper = RetentionSweeper::new(
        store.clone(),
        cache,
        RetentionPolicy::new().with_source("sessions", 90),
        DEFAULT_SWEEP_INTERVAL,
    );
    let report = sweeper.sweep_once();

    // u1: all expired, newest kept. u2: one fresh record, the old one goes.
    assert_eq!(report.deleted["sessions"], 3);
    let u1: Vec<String> = store
        .list("sessions", "u1", None, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(u1, vec!["s3"]);
    assert_eq!(store.count("sessions", "u2").unwrap(), 1);
    // No policy for tasks.
    assert_eq!(store.count("tasks", "u1").unwrap(), 1);
}

#[test]
fn test_sweep_also_evicts_expired_cache_entries() {
    let (_dir, store, clock, cache) = setup();
    cache.insert(&ContextFingerprint::new("u1", "mentor", "s1"), CompositeContext::default());
    clock.advance(chrono::Duration::minutes(6));
    cache.insert(&ContextFingerprint::new("u2", "mentor", "s1"), CompositeContext::default());

    let sweeper = RetentionSweeper::new(
        store,
        Arc::clone(&cache),
        RetentionPolicy::new(),
        DEFAULT_SWEEP_INTERVAL,
    );
    let report = sweeper.sweep_once();
    assert_eq!(report.cache_evicted, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_sweep_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    {
        let store = SledRecordStore::new(temp_dir.path()).unwrap();
        store.put(&record("goals", "u1", "g1", 400, &clock)).unwrap();
        store.put(&record("goals", "u1", "g2", 1, &clock)).unwrap();
        let sweeper = RetentionSweeper::new(
            Arc::new(store),
            Arc::new(ContextCache::with_clock(CacheSettings::default(), clock.clone())),
            RetentionPolicy::new().with_source("goals", 30),
            DEFAULT_SWEEP_INTERVAL,
        );
        assert_eq!(sweeper.sweep_once().total_deleted(), 1);
    }

    let store = SledRecordStore::new(temp_dir.path()).unwrap();
    let ids: Vec<String> = store
        .list("goals", "u1", None, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["g2"]);
}
