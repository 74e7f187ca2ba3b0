//! Context compressor: lossy per-entity projection plus source truncation so the
//! serialized context fits a byte budget.

use crate::context::types::CompositeContext;
use crate::source::names;
use crate::types::{serialized_len, Record};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default serialized size budget: 1 MiB.
pub const DEFAULT_BUDGET_BYTES: usize = 1024 * 1024;

/// Entity categories with a known projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Goal,
    Session,
    RewardBadge,
}

impl EntityKind {
    /// Entity kind stored under a source name, if it has a projection.
    pub fn for_source(source: &str) -> Option<Self> {
        match source {
            names::TASKS => Some(EntityKind::Task),
            names::GOALS => Some(EntityKind::Goal),
            names::SESSIONS => Some(EntityKind::Session),
            names::REWARDS | "badges" => Some(EntityKind::RewardBadge),
            _ => None,
        }
    }

    fn fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Task => &[
                "id",
                "title",
                "priority",
                "completed",
                "dueDate",
                "estimate",
                "linkedGoalIds",
                "sessionCount",
            ],
            EntityKind::Goal => &[
                "id",
                "title",
                "progress",
                "targetDate",
                "completed",
                "linkedTaskCount",
            ],
            EntityKind::Session => &[
                "id",
                "kind",
                "duration",
                "completed",
                "taskId",
                "goalId",
                "createdAt",
            ],
            EntityKind::RewardBadge => &["id", "name", "description", "awardedAt"],
        }
    }
}

/// Project a record down to the minimal field set for its kind.
///
/// Non-object records pass through untouched. Fields missing from the record
/// are left out rather than nulled.
pub fn project(kind: EntityKind, record: &Record) -> Record {
    let Value::Object(source) = record else {
        return record.clone();
    };

    let mut out = Map::new();
    for field in kind.fields() {
        if let Some(value) = source.get(*field) {
            if !value.is_null() {
                out.insert((*field).to_string(), value.clone());
            }
        }
    }

    if !out.contains_key("id") {
        if let Some(id) = source.get("_id") {
            out.insert("id".to_string(), id.clone());
        }
    }

    match kind {
        EntityKind::Task => {
            if !out.contains_key("linkedGoalIds") {
                if let Some(Value::Array(goals)) = source.get("linkedGoals") {
                    let ids: Vec<Value> = goals.iter().filter_map(relation_id).collect();
                    out.insert("linkedGoalIds".to_string(), Value::Array(ids));
                }
            }
            if !out.contains_key("sessionCount") {
                if let Some(Value::Array(sessions)) = source.get("sessions") {
                    out.insert("sessionCount".to_string(), Value::from(sessions.len()));
                }
            }
        }
        EntityKind::Goal => {
            if !out.contains_key("linkedTaskCount") {
                if let Some(Value::Array(tasks)) = source.get("linkedTasks") {
                    out.insert("linkedTaskCount".to_string(), Value::from(tasks.len()));
                }
            }
        }
        EntityKind::Session => {
            if !out.contains_key("kind") {
                if let Some(kind) = source.get("type") {
                    out.insert("kind".to_string(), kind.clone());
                }
            }
        }
        EntityKind::RewardBadge => {}
    }

    Value::Object(out)
}

/// A relation is either a bare id or an object carrying `id`/`_id`.
fn relation_id(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) | Value::Number(_) => Some(value.clone()),
        Value::Object(obj) => obj.get("id").or_else(|| obj.get("_id")).cloned(),
        _ => None,
    }
}

/// Shrinks contexts that serialize larger than a byte budget.
#[derive(Debug, Clone, Copy)]
pub struct ContextCompressor {
    budget_bytes: usize,
}

impl Default for ContextCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET_BYTES)
    }
}

impl ContextCompressor {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    pub fn compress(&self, context: CompositeContext) -> CompositeContext {
        compress(context, self.budget_bytes)
    }
}

/// Fit `context` into `budget_bytes` of serialized JSON.
///
/// Under budget the context comes back unchanged. Over budget, every record of a
/// known entity kind is projected; if that is not enough, sources are emptied
/// from the lowest priority up until the context fits or only the highest
/// priority source still holds records. A context that cannot be fit is still
/// returned, flagged `truncated` and `budget_exceeded`.
pub fn compress(mut context: CompositeContext, budget_bytes: usize) -> CompositeContext {
    let original_size = serialized_len(&context);
    if original_size <= budget_bytes {
        return context;
    }

    for (source, records) in context.scope_data.iter_mut() {
        if let Some(kind) = EntityKind::for_source(source) {
            for record in records.iter_mut() {
                *record = project(kind, record);
            }
        }
    }
    context.metadata.compressed = true;

    let mut size = serialized_len(&context);
    debug!(
        original_bytes = original_size,
        projected_bytes = size,
        budget_bytes,
        "Projected oversized context"
    );

    // scope_data is in descending priority; walk it from the back.
    let mut index = context.scope_data.len();
    while size > budget_bytes && index > 1 {
        index -= 1;
        let Some((source, records)) = context.scope_data.get_index_mut(index) else {
            break;
        };
        if records.is_empty() {
            continue;
        }
        records.clear();
        let source = source.clone();
        context.metadata.truncated = true;
        context.metadata.dropped_sources.push(source);
        size = serialized_len(&context);
    }

    if size > budget_bytes {
        context.metadata.truncated = true;
        context.metadata.budget_exceeded = true;
        size = serialized_len(&context);
        warn!(
            subject_id = %context.subject_context.subject_id,
            size_bytes = size,
            budget_bytes,
            "Context still over budget after compression"
        );
    } else if context.metadata.truncated {
        warn!(
            subject_id = %context.subject_context.subject_id,
            dropped = ?context.metadata.dropped_sources,
            size_bytes = size,
            budget_bytes,
            "Dropped low priority sources to fit budget"
        );
    }

    context
}
