//! Migration configuration.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::silences_path;
use crate::types::OrgId;

/// Default data root, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data";

/// Environment variable overriding the data root.
pub const DATA_PATH_ENV: &str = "GF_PATHS_DATA";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the silence migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Root under which `alerting/<org_id>/silences` files are written.
    ///
    /// Default: `data`. Configure via `GF_PATHS_DATA`.
    pub data_path: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl MigrationConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        MigrationConfig {
            data_path: data_path.into(),
        }
    }

    /// Creates a config from environment variables, defaulting unset values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(DATA_PATH_ENV).filter(|s| !s.is_empty()) {
            Some(data_path) => MigrationConfig::new(data_path),
            None => MigrationConfig::default(),
        }
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Returns the silence file path for an organization.
    pub fn silences_path(&self, org_id: OrgId) -> PathBuf {
        silences_path(&self.data_path, org_id)
    }
}
