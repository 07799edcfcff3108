//! Configuration file
//!
//! Port settings and protocol timing, stored as pretty-printed JSON.
//! Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::protocol::{
    ConnectionSettings, PortConfig, DEFAULT_DISPATCH_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};

/// Errors reading or writing a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("invalid config file {path}: {source}")]
    Json {
        /// File that failed
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

/// Oven link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvenConfig {
    /// Serial port settings
    pub port: PortConfig,
    /// Response timeout in milliseconds
    pub response_timeout_ms: u64,
    /// How often the dispatcher is ticked, in milliseconds
    pub dispatch_interval_ms: u64,
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            response_timeout_ms: DEFAULT_TIMEOUT_MS,
            dispatch_interval_ms: DEFAULT_DISPATCH_INTERVAL_MS,
        }
    }
}

impl OvenConfig {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_error)?;
        debug!("saved config to {}", path.display());
        Ok(())
    }

    /// Timing settings for an [`crate::protocol::OvenConnection`]
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        }
    }

    /// Interval between service ticks
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Parity;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("oven.json");

        let mut config = OvenConfig::default();
        config.port = PortConfig::new("/dev/ttyUSB3", 19200);
        config.port.parity = Parity::Even;
        config.response_timeout_ms = 250;
        config.save(&path).unwrap();

        assert_eq!(OvenConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oven.json");
        fs::write(&path, r#"{ "port": { "port_name": "COM4" } }"#).unwrap();

        let config = OvenConfig::load(&path).unwrap();
        assert_eq!(config.port.port_name, "COM4");
        assert_eq!(config.port.baud_rate, 9600);
        assert_eq!(config.response_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(
            config.connection_settings().response_timeout,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = OvenConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oven.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            OvenConfig::load(&path),
            Err(ConfigError::Json { .. })
        ));
    }
}
