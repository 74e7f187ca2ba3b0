//! Integration tests for end-to-end context builds

use crate::integration::test_utils::{fixed_source, registry};
use mentorctx::cache::{CacheSettings, ContextCache};
use mentorctx::clock::ManualClock;
use mentorctx::config::EngineConfig;
use mentorctx::context::{
    render_context, AggregatorConfig, ContextAggregator, ContextCompressor, ConversationLog, Role,
};
use mentorctx::ContextService;
use std::sync::Arc;

fn service(descriptors: Vec<mentorctx::DataSourceDescriptor>) -> ContextService {
    ContextService::from_config(
        &EngineConfig::default(),
        registry(descriptors),
        Arc::new(ManualClock::starting_now()),
    )
}

#[tokio::test]
async fn test_tasks_capped_and_profile_kept() {
    let service = service(vec![
        fixed_source("tasks", 20, 20, 25),
        fixed_source("profile", 10, 1, 1),
    ]);

    let ctx = service
        .build_context("u1", "mentor", "s1", &["tasks".to_string(), "profile".to_string()])
        .await
        .unwrap();

    assert_eq!(ctx.scope_data["tasks"].len(), 20);
    assert_eq!(ctx.scope_data["profile"].len(), 1);
    assert_eq!(ctx.metadata.sources, vec!["tasks", "profile"]);
    assert_eq!(ctx.subject_context.subject_id, "u1");
    assert!(!ctx.metadata.cached);
}

#[tokio::test]
async fn test_thousand_records_truncated_to_cap() {
    let service = service(vec![fixed_source("sessions", 1, 20, 1000)]);
    let ctx = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    assert_eq!(ctx.scope_data["sessions"].len(), 20);
}

#[tokio::test]
async fn test_scope_data_iterates_in_priority_order() {
    let service = service(vec![
        fixed_source("a", 1, 5, 1),
        fixed_source("b", 2, 5, 1),
        fixed_source("c", 3, 5, 1),
    ]);
    let ctx = service
        .build_context("u1", "mentor", "s1", &["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();
    let keys: Vec<&String> = ctx.scope_data.keys().collect();
    assert_eq!(keys, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_conversation_window_merged_and_bounded() {
    let mut config = EngineConfig::default();
    config.conversation.max_turns = 3;
    let service = ContextService::from_config(
        &config,
        registry(vec![fixed_source("tasks", 1, 5, 2)]),
        Arc::new(ManualClock::starting_now()),
    );

    for i in 0..5 {
        service.record_turn("s1", Role::User, format!("message {}", i));
    }
    let ctx = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    let contents: Vec<&str> = ctx.conversation.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);

    let other = service.build_context("u1", "mentor", "s2", &[]).await.unwrap();
    assert!(other.conversation.is_empty());
}

#[tokio::test]
async fn test_oversized_context_is_compressed_to_budget() {
    let aggregator = ContextAggregator::new(
        registry(vec![
            fixed_source("tasks", 3, 50, 50),
            fixed_source("goals", 2, 50, 50),
            fixed_source("rewards", 1, 50, 50),
        ]),
        AggregatorConfig::default(),
    );
    let service = ContextService::new(
        aggregator,
        Arc::new(ContextCache::new(CacheSettings::default())),
        Arc::new(ConversationLog::new(20)),
        ContextCompressor::new(4096),
    );

    let ctx = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();
    let size = serde_json::to_vec(&ctx).unwrap().len();
    assert!(ctx.metadata.compressed);
    assert!(size <= 4096 || ctx.metadata.truncated);
    assert!(ctx.scope_data.contains_key("tasks"));
}

#[tokio::test]
async fn test_rendered_prompt_follows_priority() {
    let service = service(vec![
        fixed_source("goals", 5, 5, 1),
        fixed_source("tasks", 9, 5, 1),
    ]);
    service.record_turn("s1", Role::User, "Where was I?");
    let ctx = service.build_context("u1", "mentor", "s1", &[]).await.unwrap();

    let text = render_context(&ctx);
    assert!(text.find("## Tasks").unwrap() < text.find("## Goals").unwrap());
    assert!(text.contains("user: Where was I?"));
}
