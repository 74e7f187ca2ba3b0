//! Error types for the context aggregation and caching engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that abort a context build or a setup operation.
///
/// Only `UnknownSource` and `SubjectNotFound` abort `build_context`; load failures
/// on non-critical sources are reported as [`SourceLoadError`] values instead.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Duplicate source: {0}")]
    DuplicateSource(String),

    #[error("Subject not found: {subject_id} (critical source '{source_name}': {reason})")]
    SubjectNotFound {
        subject_id: String,
        source_name: String,
        reason: String,
    },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::ConfigError(err.to_string())
    }
}

/// How a non-critical source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailure {
    Failed,
    TimedOut,
}

/// A non-critical source failure recorded during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("source '{source_name}' {kind:?}: {message}")]
pub struct SourceLoadError {
    #[serde(rename = "source")]
    pub source_name: String,
    pub kind: LoadFailure,
    pub message: String,
}

impl SourceLoadError {
    pub fn failed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            kind: LoadFailure::Failed,
            message: message.into(),
        }
    }

    pub fn timed_out(source_name: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            source_name: source_name.into(),
            kind: LoadFailure::TimedOut,
            message: format!("loader exceeded {} ms", timeout_ms),
        }
    }
}

pub(crate) fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}

pub(crate) fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::Serialization(err.to_string())
}
