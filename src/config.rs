//! Configuration System
//!
//! Layered configuration for the context engine: built-in defaults, the global
//! user file, workspace files, then `MENTORCTX__SECTION__KEY` environment
//! overrides. Validated before use.

use crate::cache::CacheSettings;
use crate::context::AggregatorConfig;
use crate::logging::LoggingConfig;
use crate::retention::RetentionPolicy;
use crate::source::names;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    /// Store-backed sources registered at startup. Replaces the default set
    /// entirely when present.
    #[serde(default = "default_sources")]
    pub sources: HashMap<String, SourceConfig>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            aggregation: AggregationConfig::default(),
            conversation: ConversationConfig::default(),
            retention: RetentionConfig::default(),
            sources: default_sources(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Serialized size budget for one context.
    #[serde(default = "default_budget_bytes")]
    pub budget_bytes: usize,

    #[serde(default)]
    pub coalesce_builds: bool,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_budget_bytes() -> usize {
    1024 * 1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            budget_bytes: default_budget_bytes(),
            coalesce_builds: false,
        }
    }
}

impl CacheConfig {
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            ttl: Duration::from_secs(self.ttl_secs),
            coalesce_builds: self.coalesce_builds,
        }
    }
}

/// `[aggregation]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub default_sources: Vec<String>,

    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_load_timeout_ms() -> u64 {
    5000
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_sources: Vec::new(),
            worker_pool_size: default_worker_pool_size(),
            load_timeout_ms: default_load_timeout_ms(),
        }
    }
}

impl AggregationConfig {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            default_sources: self.default_sources.clone(),
            worker_pool_size: self.worker_pool_size,
            load_timeout: Duration::from_millis(self.load_timeout_ms),
        }
    }
}

/// `[conversation]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Sessions with no turn for this long are dropped by the sweeper.
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

fn default_max_turns() -> usize {
    20
}

fn default_idle_secs() -> u64 {
    60 * 60 * 24
}

impl ConversationConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            idle_secs: default_idle_secs(),
        }
    }
}

/// `[retention]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Source name -> max age in days.
    #[serde(default)]
    pub policies: RetentionPolicy,
}

fn default_interval_secs() -> u64 {
    60 * 60 * 24
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            policies: RetentionPolicy::new(),
        }
    }
}

impl RetentionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// `[sources.<name>]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Failure aborts the build with `SubjectNotFound`.
    #[serde(default)]
    pub critical: bool,
}

fn default_max_items() -> usize {
    20
}

impl SourceConfig {
    pub fn new(priority: i32, max_items: usize) -> Self {
        Self {
            priority,
            max_items,
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

fn default_sources() -> HashMap<String, SourceConfig> {
    HashMap::from([
        (names::PROFILE.to_string(), SourceConfig::new(100, 1).critical()),
        (names::PREFERENCES.to_string(), SourceConfig::new(90, 1)),
        (names::TASKS.to_string(), SourceConfig::new(80, 20)),
        (names::GOALS.to_string(), SourceConfig::new(70, 10)),
        (names::SESSIONS.to_string(), SourceConfig::new(60, 10)),
        (names::REWARDS.to_string(), SourceConfig::new(50, 10)),
    ])
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record store directory, relative to the workspace root unless absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".mentorctx/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Cache(String),
    Aggregation(String),
    Conversation(String),
    Retention(String),
    Source(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Aggregation(msg) => write!(f, "Aggregation: {}", msg),
            ValidationError::Conversation(msg) => write!(f, "Conversation: {}", msg),
            ValidationError::Retention(msg) => write!(f, "Retention: {}", msg),
            ValidationError::Source(name, msg) => write!(f, "Source '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EngineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.cache.ttl_secs == 0 {
            errors.push(ValidationError::Cache("ttl_secs must be greater than 0".to_string()));
        }
        if self.cache.budget_bytes == 0 {
            errors.push(ValidationError::Cache(
                "budget_bytes must be greater than 0".to_string(),
            ));
        }

        if self.aggregation.worker_pool_size == 0 {
            errors.push(ValidationError::Aggregation(
                "worker_pool_size must be greater than 0".to_string(),
            ));
        }
        for name in &self.aggregation.default_sources {
            if !self.sources.contains_key(name) {
                errors.push(ValidationError::Aggregation(format!(
                    "default source '{}' is not configured under [sources]",
                    name
                )));
            }
        }

        if self.conversation.max_turns == 0 {
            errors.push(ValidationError::Conversation(
                "max_turns must be greater than 0".to_string(),
            ));
        }
        if self.conversation.idle_secs == 0 {
            errors.push(ValidationError::Conversation(
                "idle_secs must be greater than 0".to_string(),
            ));
        }

        if self.retention.interval_secs == 0 {
            errors.push(ValidationError::Retention(
                "interval_secs must be greater than 0".to_string(),
            ));
        }

        let mut names: Vec<&String> = self.sources.keys().collect();
        names.sort();
        for name in names {
            if name.trim().is_empty() {
                errors.push(ValidationError::Source(
                    name.clone(),
                    "name cannot be empty".to_string(),
                ));
            }
            if self.sources[name].max_items == 0 {
                errors.push(ValidationError::Source(
                    name.clone(),
                    "max_items must be greater than 0".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
