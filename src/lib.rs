//! mentorctx: context aggregation and caching engine.
//!
//! Builds a bounded, per-subject context for generation prompts by pulling
//! from prioritized data sources, merging recent conversation, compressing to
//! a size budget and caching the result per `(subject, scope kind, session)`.
//! A retention sweeper ages out upstream records and expired cache entries.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod retention;
pub mod service;
pub mod source;
pub mod store;
pub mod types;

pub use cache::{ContextCache, ContextFingerprint};
pub use context::{CompositeContext, ContextRequest, Role, Turn};
pub use error::{ContextError, SourceLoadError, StorageError};
pub use service::ContextService;
pub use source::{DataSourceDescriptor, DataSourceLoader, DataSourceRegistry};
