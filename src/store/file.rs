use crate::store::MemberStore;
use crate::types::{ChangeSet, MemberMap};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// `.yaml` and `.yml` files are YAML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SnapshotFormat::Yaml
            }
            _ => SnapshotFormat::Json,
        }
    }

    pub fn parse(self, content: &str) -> Result<MemberMap> {
        match self {
            SnapshotFormat::Json => {
                serde_json::from_str(content).context("Failed to parse JSON snapshot")
            }
            SnapshotFormat::Yaml => {
                serde_yaml::from_str(content).context("Failed to parse YAML snapshot")
            }
        }
    }

    pub fn render(self, members: &MemberMap) -> Result<String> {
        match self {
            SnapshotFormat::Json => {
                serde_json::to_string_pretty(members).context("Failed to serialize JSON snapshot")
            }
            SnapshotFormat::Yaml => {
                serde_yaml::to_string(members).context("Failed to serialize YAML snapshot")
            }
        }
    }
}

/// Whole-tree snapshot kept in a single JSON or YAML file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: SnapshotFormat,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = SnapshotFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format<P: AsRef<Path>>(path: P, format: SnapshotFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    pub async fn exists(&self) -> Result<bool> {
        fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check snapshot at {:?}", self.path))
    }
}

#[async_trait]
impl MemberStore for FileStore {
    async fn load_members(&self) -> Result<MemberMap> {
        if !self.exists().await? {
            warn!("No snapshot at {:?}, starting with an empty tree", self.path);
            return Ok(MemberMap::new());
        }

        debug!("Loading snapshot from: {:?}", self.path);
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot from {:?}", self.path))?;
        let members = self
            .format
            .parse(&content)
            .with_context(|| format!("Invalid snapshot in {:?}", self.path))?;

        info!("Loaded {} members from {:?}", members.len(), self.path);
        Ok(members)
    }

    async fn persist(&self, members: &MemberMap, changes: &ChangeSet) -> Result<()> {
        let content = self.format.render(members)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        // Write next to the target and rename so a crash never leaves half a file.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, content)
            .await
            .with_context(|| format!("Failed to write snapshot to {:?}", staging))?;
        fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace snapshot at {:?}", self.path))?;

        info!(
            "Saved {} members to {:?} ({} modified, {} deleted)",
            members.len(),
            self.path,
            changes.modified.len(),
            changes.deleted.len()
        );
        Ok(())
    }
}
