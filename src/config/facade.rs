//! Config loader: builds an `EngineConfig` from the layered sources.

use super::merge::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::EngineConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads configuration layers in precedence order.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<EngineConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            sources = config.sources.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Defaults plus one explicit file, then environment. Skips the global
    /// and workspace files.
    pub fn load_from_file(path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let builder = builder_with_defaults()?.add_source(File::from(path));
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Built-in defaults only.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> EngineConfig {
        EngineConfig::default()
    }

    /// Where the global config file is looked up.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
