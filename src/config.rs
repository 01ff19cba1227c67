//! Configuration provider for benchmark runs.
//!
//! Supplies the default data-file directory that `load_*` tests interpolate
//! into their instructions, plus arbitrary per-suite option maps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Read-only configuration surface consumed by the harness.
pub trait ConfigProvider: Send + Sync {
    /// Root directory for benchmark data files. Suite definitions interpolate
    /// this into `load_*` instructions at registration time.
    fn default_directory(&self) -> Result<PathBuf, ConfigError>;

    /// Arbitrary key/value overrides for one suite. Unknown suites get an
    /// empty map.
    fn suite_config(&self, suite_id: &str) -> HashMap<String, serde_json::Value>;
}

/// File-backed configuration, deserialized from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Root directory for benchmark data files.
    pub data_dir: Option<PathBuf>,
    /// Per-suite overrides keyed by suite id.
    #[serde(default)]
    pub suites: HashMap<String, HashMap<String, serde_json::Value>>,
}

impl BenchConfig {
    /// Creates a config rooted at the given data directory.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            suites: HashMap::new(),
        }
    }

    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::InvalidValue {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Adds an override for one suite.
    pub fn set_suite_option(
        &mut self,
        suite_id: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) {
        self.suites
            .entry(suite_id.into())
            .or_default()
            .insert(key.into(), value);
    }
}

impl ConfigProvider for BenchConfig {
    fn default_directory(&self) -> Result<PathBuf, ConfigError> {
        let dir = self
            .data_dir
            .clone()
            .ok_or(ConfigError::MissingDefaultDirectory)?;
        if !dir.exists() {
            return Err(ConfigError::DirectoryNotFound(
                dir.display().to_string(),
            ));
        }
        Ok(dir)
    }

    fn suite_config(&self, suite_id: &str) -> HashMap<String, serde_json::Value> {
        self.suites.get(suite_id).cloned().unwrap_or_default()
    }
}
