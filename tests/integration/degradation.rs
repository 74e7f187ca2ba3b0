//! Integration tests for partial-failure behavior

use crate::integration::test_utils::{failing_source, fixed_source, registry};
use async_trait::async_trait;
use mentorctx::clock::ManualClock;
use mentorctx::config::EngineConfig;
use mentorctx::error::{ContextError, LoadFailure};
use mentorctx::source::{DataSourceDescriptor, DataSourceLoader};
use mentorctx::types::Record;
use mentorctx::ContextService;
use std::sync::Arc;
use std::time::Duration;

struct HangingLoader;

#[async_trait]
impl DataSourceLoader for HangingLoader {
    async fn load(
        &self,
        _subject_id: &str,
        _scope_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<Record>, ContextError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
    }
}

fn service_with(descriptors: Vec<DataSourceDescriptor>, timeout_ms: u64) -> ContextService {
    let mut config = EngineConfig::default();
    config.aggregation.load_timeout_ms = timeout_ms;
    ContextService::from_config(
        &config,
        registry(descriptors),
        Arc::new(ManualClock::starting_now()),
    )
}

#[tokio::test]
async fn test_one_failing_source_of_three() {
    let service = service_with(
        vec![
            fixed_source("tasks", 3, 10, 2),
            failing_source("goals", 2),
            fixed_source("sessions", 1, 10, 4),
        ],
        5000,
    );

    let ctx = service
        .build_context(
            "u1",
            "mentor",
            "s1",
            &["tasks".to_string(), "goals".to_string(), "sessions".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(ctx.scope_data.len(), 2);
    assert!(!ctx.scope_data.contains_key("goals"));
    assert_eq!(ctx.metadata.load_errors.len(), 1);
    assert_eq!(ctx.metadata.load_errors[0].source_name, "goals");
    assert_eq!(ctx.metadata.load_errors[0].kind, LoadFailure::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_source_times_out() {
    let service = service_with(
        vec![
            fixed_source("tasks", 2, 10, 1),
            DataSourceDescriptor::new("rewards", 1, 10, Arc::new(HangingLoader)),
        ],
        200,
    );

    let ctx = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert_eq!(ctx.metadata.sources, vec!["tasks"]);
    assert_eq!(ctx.metadata.load_errors[0].kind, LoadFailure::TimedOut);
}

#[tokio::test]
async fn test_critical_failure_aborts_build() {
    let service = service_with(
        vec![failing_source("profile", 10).critical(), fixed_source("tasks", 1, 10, 3)],
        5000,
    );
    let err = service
        .build_context("ghost", "mentor", "s1", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ContextError::SubjectNotFound { ref subject_id, .. } if subject_id == "ghost"
    ));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_unknown_source_aborts_build() {
    let service = service_with(vec![fixed_source("tasks", 1, 10, 3)], 5000);
    let err = service
        .build_context("u1", "mentor", "s1", &["quests".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::UnknownSource(name) if name == "quests"));
}

#[tokio::test]
async fn test_degraded_context_is_cached() {
    let service = service_with(
        vec![fixed_source("tasks", 2, 10, 1), failing_source("goals", 1)],
        5000,
    );
    service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    let again = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert!(again.metadata.cached);
    assert_eq!(again.metadata.load_errors.len(), 1);
}
