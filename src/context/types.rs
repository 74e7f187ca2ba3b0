//! Context value types: the composite context, its metadata, and dialogue turns.

use crate::error::SourceLoadError;
use crate::types::{Record, Timestamp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a caller asks a context to be built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRequest {
    pub subject_id: String,
    pub scope_kind: String,
    pub scope_id: Option<String>,
    pub session_id: String,
    /// Empty means the configured default set.
    pub sources: Vec<String>,
}

impl ContextRequest {
    pub fn new(
        subject_id: impl Into<String>,
        scope_kind: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            scope_kind: scope_kind.into(),
            scope_id: None,
            session_id: session_id.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_scope_id(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = Some(scope_id.into());
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }
}

/// Who the context is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubjectContext {
    pub subject_id: String,
    pub scope_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,
    pub session_id: String,
    /// First record of the critical source, when one was loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Record>,
}

/// Build bookkeeping carried alongside the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    /// Sources present in `scope_data`, highest priority first.
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_errors: Vec<SourceLoadError>,
    pub cached: bool,
    pub compressed: bool,
    pub truncated: bool,
    /// Still over budget after every reduction step.
    pub budget_exceeded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_sources: Vec<String>,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<Timestamp>,
    pub build_ms: u64,
}

/// The bounded context handed to downstream generation calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompositeContext {
    pub subject_context: SubjectContext,
    /// Source name to records, in descending source priority.
    pub scope_data: IndexMap<String, Vec<Record>>,
    pub conversation: Vec<Turn>,
    pub metadata: ContextMetadata,
}

impl CompositeContext {
    pub fn records(&self, source: &str) -> Option<&[Record]> {
        self.scope_data.get(source).map(|v| v.as_slice())
    }
}

/// Speaker of a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" | "mentor" => Ok(Role::Assistant),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// One dialogue exchange. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}
