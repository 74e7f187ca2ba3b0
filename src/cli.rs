//! Command line surface for mentorctx.
//!
//! `parse` holds the clap types, `route` owns the run context and dispatches each
//! command to the context service, and `presentation` formats results.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_config_toml, format_context_text, format_sources_json, format_sources_text,
    format_stats_text, format_sweep_report_text, to_json_pretty,
};
pub use route::RunContext;
