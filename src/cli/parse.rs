//! CLI parse: clap types for mentorctx. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mentorctx - per-subject context aggregation and caching for generation prompts
#[derive(Parser)]
#[command(name = "mentorctx")]
#[command(about = "Aggregate, cache and compress per-subject context for generation prompts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store one upstream record
    Ingest {
        /// Source name (tasks, goals, sessions, ...)
        #[arg(long)]
        source: String,
        /// Subject the record belongs to
        #[arg(long)]
        subject: String,
        /// Scope the record belongs to (unscoped records match every scope)
        #[arg(long)]
        scope: Option<String>,
        /// Creation time (RFC 3339, default: now)
        #[arg(long)]
        at: Option<String>,
        /// Record as a JSON object
        record: String,
    },
    /// Build the context for a subject and session
    Build {
        #[arg(long)]
        subject: String,
        /// Scope kind (e.g. mentor, quest)
        #[arg(long, default_value = "mentor")]
        scope_kind: String,
        #[arg(long)]
        session: String,
        /// Scope id passed to loaders
        #[arg(long)]
        scope_id: Option<String>,
        /// Sources to load (comma-separated, default: configured set)
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
        /// Output format (text, json or prompt)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Record a dialogue turn for a session
    Turn {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        session: String,
        /// Speaker (user, assistant, system)
        #[arg(long, default_value = "user")]
        role: String,
        content: String,
    },
    /// Run one retention sweep
    Sweep {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show cache statistics and metrics
    Stats {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List registered sources in priority order
    Sources {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration after every layer is merged
    Config {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}
