//! CLI presentation: text and json formatters per command.

use crate::config::EngineConfig;
use crate::context::CompositeContext;
use crate::error::{ContextError, StorageError};
use crate::metrics::StatsReport;
use crate::retention::SweepReport;
use crate::source::DataSourceDescriptor;
use comfy_table::Table;
use serde::Serialize;

pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, ContextError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ContextError::StorageError(StorageError::Serialization(e.to_string())))
}

pub fn format_config_toml(config: &EngineConfig) -> Result<String, ContextError> {
    toml::to_string_pretty(config)
        .map_err(|e| ContextError::ConfigError(format!("Failed to render config: {}", e)))
}

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table
}

/// Summary of a built context: one row per source plus build flags.
pub fn format_context_text(context: &CompositeContext) -> String {
    let subject = &context.subject_context;
    let meta = &context.metadata;

    let mut out = format!(
        "Context for {} ({}, session {})\n  Version: {}\n  Cached: {}\n  Build: {} ms\n",
        subject.subject_id, subject.scope_kind, subject.session_id, meta.version, meta.cached,
        meta.build_ms
    );
    if meta.compressed {
        out.push_str("  Compressed: yes\n");
    }
    if meta.truncated {
        out.push_str(&format!(
            "  Truncated: yes (emptied: {})\n",
            meta.dropped_sources.join(", ")
        ));
    }
    if meta.budget_exceeded {
        out.push_str("  Budget exceeded: yes\n");
    }

    let mut rows = table();
    rows.set_header(vec!["Source", "Records"]);
    for (source, records) in &context.scope_data {
        rows.add_row(vec![source.clone(), records.len().to_string()]);
    }
    out.push_str(&rows.to_string());

    out.push_str(&format!("\nConversation turns: {}", context.conversation.len()));
    for err in &meta.load_errors {
        out.push_str(&format!("\nDegraded: {} ({:?}): {}", err.source_name, err.kind, err.message));
    }
    out
}

pub fn format_sweep_report_text(report: &SweepReport) -> String {
    let mut rows = table();
    rows.set_header(vec!["Source", "Deleted", "Error"]);
    for (source, count) in &report.deleted {
        rows.add_row(vec![source.clone(), count.to_string(), "-".to_string()]);
    }
    for (source, message) in &report.failures {
        rows.add_row(vec![source.clone(), "-".to_string(), message.clone()]);
    }
    format!(
        "{}\nRecords deleted: {}\nCache entries evicted: {}\nSessions evicted: {}",
        rows,
        report.total_deleted(),
        report.cache_evicted,
        report.sessions_evicted
    )
}

pub fn format_stats_text(stats: &StatsReport) -> String {
    let m = &stats.metrics;
    let mut out = format!(
        "Cache entries: {}\nTTL: {}s\nHits: {}\nMisses: {}\nBuilds: {} ({} failed)\nAverage build: {:.1} ms\nInvalidated: {}\nSwept: {}",
        stats.cache.entry_count,
        stats.cache.ttl_secs,
        m.hits,
        m.misses,
        m.builds,
        m.build_failures,
        m.average_build_ms,
        m.invalidated,
        m.swept
    );
    if !stats.cache.fingerprints.is_empty() {
        out.push_str("\nFingerprints:");
        for fp in &stats.cache.fingerprints {
            out.push_str(&format!("\n  - {}", fp));
        }
    }
    out
}

pub fn format_sources_text(sources: &[&DataSourceDescriptor]) -> String {
    if sources.is_empty() {
        return "No sources registered.".to_string();
    }
    let mut rows = table();
    rows.set_header(vec!["Name", "Priority", "Max items", "Critical"]);
    for d in sources {
        rows.add_row(vec![
            d.name.clone(),
            d.priority.to_string(),
            d.max_items.to_string(),
            if d.critical { "yes" } else { "no" }.to_string(),
        ]);
    }
    rows.to_string()
}

pub fn format_sources_json(sources: &[&DataSourceDescriptor]) -> Result<String, ContextError> {
    let rows: Vec<serde_json::Value> = sources
        .iter()
        .map(|d| {
            serde_json::json!({
                "name": d.name,
                "priority": d.priority,
                "maxItems": d.max_items,
                "critical": d.critical,
            })
        })
        .collect();
    to_json_pretty(&rows)
}
