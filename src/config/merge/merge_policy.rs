//! Built-in defaults: the lowest configuration layer.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// `sources` gets no defaults here: a configured `[sources]` table replaces the
/// built-in set rather than merging into it.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("cache.ttl_secs", 300)?
        .set_default("cache.budget_bytes", 1_048_576)?
        .set_default("cache.coalesce_builds", false)?
        .set_default("aggregation.worker_pool_size", 4)?
        .set_default("aggregation.load_timeout_ms", 5000)?
        .set_default("conversation.max_turns", 20)?
        .set_default("conversation.idle_secs", 86_400)?
        .set_default("retention.interval_secs", 86_400)?
        .set_default("storage.path", ".mentorctx/store")
}
