//! Shared test utilities for integration tests
//!
//! Source and registry builders, plus serialized access to process-wide
//! environment variables for the configuration tests.

use mentorctx::error::ContextError;
use mentorctx::source::{DataSourceDescriptor, DataSourceRegistry, FnLoader};
use mentorctx::types::Record;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serializes environment variable access across tests in this binary.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// `n` records `{ "id": i, "title": "<prefix> i" }`.
pub fn records(prefix: &str, n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| json!({ "id": format!("{}-{}", prefix, i), "title": format!("{} {}", prefix, i) }))
        .collect()
}

/// Source that always returns `n` records.
pub fn fixed_source(name: &str, priority: i32, max_items: usize, n: usize) -> DataSourceDescriptor {
    let items = records(name, n);
    DataSourceDescriptor::new(
        name,
        priority,
        max_items,
        Arc::new(FnLoader::new(move |_, _| Ok(items.clone()))),
    )
}

/// Source whose loader always errors.
pub fn failing_source(name: &str, priority: i32) -> DataSourceDescriptor {
    DataSourceDescriptor::new(
        name,
        priority,
        10,
        Arc::new(FnLoader::new(|_, _| {
            Err(ContextError::BuildFailed("upstream unavailable".to_string()))
        })),
    )
}

pub fn registry(descriptors: Vec<DataSourceDescriptor>) -> Arc<DataSourceRegistry> {
    let mut registry = DataSourceRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    Arc::new(registry)
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir` and the
/// given extra variables set; everything is restored afterwards.
pub fn with_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut keys: Vec<&str> = vec!["HOME", "XDG_CONFIG_HOME"];
    keys.extend(vars.iter().map(|(k, _)| *k));
    let saved: Vec<(String, Option<String>)> = keys
        .iter()
        .map(|k| (k.to_string(), std::env::var(k).ok()))
        .collect();

    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("xdg"));
    for (k, v) in vars {
        std::env::set_var(k, v);
    }

    let result = f();

    for (k, v) in saved {
        match v {
            Some(v) => std::env::set_var(&k, v),
            None => std::env::remove_var(&k),
        }
    }
    result
}
