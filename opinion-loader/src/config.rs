use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::common::error::{EtlError, Result};

/// Runtime settings for one load run. Defaults match the reference layout
/// (`data/` extracts next to the working directory, SQLite file store);
/// a TOML file and environment variables override them without code change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    /// Upper bound for one manifest entry, in seconds. Unset means no bound.
    pub entry_timeout_secs: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_path: PathBuf::from("analysis.db"),
            entry_timeout_secs: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            EtlError::Config(format!("cannot parse config {}: {e}", path.display()))
        })
    }

    /// Environment overrides, applied after file/default values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("OPINION_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(db) = std::env::var("OPINION_DATABASE") {
            self.database_path = PathBuf::from(db);
        }
        if let Ok(secs) = std::env::var("OPINION_ENTRY_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                self.entry_timeout_secs = Some(parsed);
            }
        }
        self
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        Ok(config.apply_env())
    }

    pub fn entry_timeout(&self) -> Option<Duration> {
        self.entry_timeout_secs.map(Duration::from_secs)
    }
}
