//! Store configuration
//!
//! Every field has a default, so a config file only needs to name the
//! settings it changes. YAML and JSON are both accepted.

use crate::graph::notify::DEFAULT_MAX_HOLD_DEPTH;
use crate::graph::storage::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tuning knobs for a [`GraphStore`](crate::GraphStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Slots per property storage chunk, a power of two
    pub chunk_size: usize,
    /// Nodes to reserve room for up front
    pub node_capacity: usize,
    /// Edges to reserve room for up front
    pub edge_capacity: usize,
    /// Deepest allowed nesting of notification holds
    pub max_hold_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            node_capacity: 1024,
            edge_capacity: 4096,
            max_hold_depth: DEFAULT_MAX_HOLD_DEPTH,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 || !self.chunk_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be a non-zero power of two, got {}",
                self.chunk_size
            )));
        }
        if self.max_hold_depth == 0 {
            return Err(ConfigError::Invalid("max_hold_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: StoreConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: StoreConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(ConfigError::Invalid(format!(
                "unsupported config extension {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.max_hold_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let config = StoreConfig::from_yaml_str("chunk_size: 256\n").unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.edge_capacity, 4096);
    }

    #[test]
    fn test_rejects_bad_chunk_size() {
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"chunk_size": 1000}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"chunk_size": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "node_capacity: 10\nmax_hold_depth: 4").unwrap();
        let config = StoreConfig::from_path(file.path()).unwrap();
        assert_eq!(config.node_capacity, 10);
        assert_eq!(config.max_hold_depth, 4);

        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(StoreConfig::from_path(file.path()).is_err());
    }
}
