//! Prompt rendering: pure projection of a composite context to text.

use crate::context::types::CompositeContext;
use crate::types::Record;
use serde_json::Value;

const LABEL_FIELDS: &[&str] = &["title", "name", "label", "kind", "id", "_id"];
const DETAIL_SKIP: &[&str] = &["title", "name", "label", "id", "_id", "description", "notes"];

/// Render a context as the text block handed to a generation call.
///
/// Sections follow `scope_data` order, so higher priority sources come first.
pub fn render_context(context: &CompositeContext) -> String {
    let subject = &context.subject_context;
    let mut out = String::new();

    out.push_str(&format!(
        "## Subject\nSubject: {}\nScope: {}",
        subject.subject_id, subject.scope_kind
    ));
    if let Some(scope_id) = &subject.scope_id {
        out.push_str(&format!(" ({})", scope_id));
    }
    out.push('\n');
    if let Some(profile) = &subject.profile {
        if let Some(details) = render_details(profile, &[]) {
            out.push_str(&format!("Profile: {}\n", details));
        }
    }

    for (source, records) in &context.scope_data {
        if records.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {} ({})\n", title_case(source), records.len()));
        for record in records {
            out.push_str(&format!("- {}\n", render_record(record)));
        }
    }

    if !context.conversation.is_empty() {
        out.push_str("\n## Recent conversation\n");
        for turn in &context.conversation {
            out.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
    }

    if context.metadata.truncated {
        out.push_str("\n[Context truncated to fit size budget]\n");
    }

    out
}

/// One-line summary: a label, then scalar details in key order.
pub fn render_record(record: &Record) -> String {
    let Value::Object(obj) = record else {
        return scalar(record).unwrap_or_else(|| record.to_string());
    };

    let label = LABEL_FIELDS
        .iter()
        .find_map(|field| obj.get(*field).and_then(scalar));

    match (label, render_details(record, DETAIL_SKIP)) {
        (Some(label), Some(details)) => format!("{} [{}]", label, details),
        (Some(label), None) => label,
        (None, Some(details)) => details,
        (None, None) => "{}".to_string(),
    }
}

fn render_details(record: &Record, skip: &[&str]) -> Option<String> {
    let Value::Object(obj) = record else {
        return None;
    };
    let mut keys: Vec<&String> = obj.keys().filter(|k| !skip.contains(&k.as_str())).collect();
    keys.sort();
    let parts: Vec<String> = keys
        .into_iter()
        .filter_map(|k| obj.get(k).and_then(scalar).map(|v| format!("{}: {}", k, v)))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(format!("{} items", items.len())),
        _ => None,
    }
}

fn title_case(source: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
