//! Config facade: single entry point that walks the sources in precedence order.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::SyllabusConfig;
use crate::error::ApiError;
use config::{Config, File};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace
    /// `config/config.toml`, `config/{SYLLABUS_ENV}.toml`, environment.
    pub fn load(workspace_root: &Path) -> Result<SyllabusConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        let config: SyllabusConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load one explicit file; environment overrides still apply.
    pub fn load_from_file(path: &Path) -> Result<SyllabusConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = builder_with_defaults()?.add_source(File::from(path.to_path_buf()));
        let builder = environment::add_to_builder(builder);
        let config: SyllabusConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        super::paths::global_config_path()
    }

    /// Defaults only, no files or environment.
    pub fn defaults() -> Result<SyllabusConfig, ApiError> {
        let config: SyllabusConfig = Config::builder().build()?.try_deserialize()?;
        Ok(config)
    }
}
