//! Configuration management for the family tree tools

use crate::kinship::{TreeOptions, ValidatorOptions};
use crate::store::{FileStore, SnapshotFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "family-tree.yaml";

/// Prefix of environment overrides, e.g. `FAMILY_TREE__STORE__PATH`.
pub const ENV_PREFIX: &str = "FAMILY_TREE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tree: TreeSettings,
    pub validation: ValidationSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    pub suggestions_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub check_duplicate_names: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
    /// Overrides the format implied by the file extension.
    pub format: Option<SnapshotFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            suggestions_enabled: true,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            check_duplicate_names: true,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("family_tree.json"),
            format: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config in {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path.as_ref(), content)
            .await
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Defaults, then the optional file, then `FAMILY_TREE__*` variables.
    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!("Reading config file {:?}", path);
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(config)
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            suggestions_enabled: self.tree.suggestions_enabled,
            validation: ValidatorOptions {
                check_duplicate_names: self.validation.check_duplicate_names,
            },
        }
    }

    pub fn file_store(&self) -> FileStore {
        match self.store.format {
            Some(format) => FileStore::with_format(&self.store.path, format),
            None => FileStore::new(&self.store.path),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Store path must not be empty"));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(anyhow::anyhow!(
                "Unknown log level '{}': expected trace, debug, info, warn or error",
                self.logging.level
            ));
        }

        Ok(())
    }
}
