//! Workspace config files: `config/config.toml`, then `config/{MENTORCTX_ENV}.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_NAME_VAR: &str = "MENTORCTX_ENV";
const DEFAULT_ENV_NAME: &str = "development";

/// Deployment name selecting the env-specific file.
pub fn env_name() -> String {
    std::env::var(ENV_NAME_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string())
}

/// Existing workspace config files, lowest precedence first.
pub fn layer_paths(workspace_root: &Path, env_name: &str) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
    .into_iter()
    .filter(|path| {
        let exists = path.is_file();
        if !exists {
            debug!(path = %path.display(), "Workspace config layer absent");
        }
        exists
    })
    .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(layer_paths(workspace_root, &env_name())
        .into_iter()
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).required(false))
        }))
}
