//! Configuration module
//!
//! Handles loading and saving CanControl configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::bus::{TransportConfig, LOOPBACK_CHANNEL};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Bus settings
    #[serde(default)]
    pub bus: BusConfig,

    /// Schema file settings
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Initial log level (error, warning, info, debug)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Interface name, or "dummy" for loopback mode
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Receive poll interval in ms
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Capacity of the inbound event queue
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,
    /// Feed frames sent in loopback mode back into the receive path
    #[serde(default)]
    pub loopback_echo: bool,
}

fn default_channel() -> String {
    LOOPBACK_CHANNEL.to_string()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_event_queue() -> usize {
    256
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            poll_interval_ms: default_poll_interval(),
            event_queue: default_event_queue(),
            loopback_echo: false,
        }
    }
}

impl BusConfig {
    pub fn transport_config(&self) -> TransportConfig {
        let config = TransportConfig::new(Duration::from_millis(self.poll_interval_ms.max(1)));
        if self.loopback_echo {
            config.with_loopback_echo()
        } else {
            config
        }
    }
}

/// Schema file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Path of the JSON order file
    #[serde(default = "default_schema_path")]
    pub path: PathBuf,
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("canorders.json")
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: default_schema_path(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("cancontrol/config.toml")),
            Some(PathBuf::from("./cancontrol.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        bus: BusConfig {
            channel: "can0".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bus.channel, LOOPBACK_CHANNEL);
        assert_eq!(config.schema.path, PathBuf::from("canorders.json"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.bus.channel = "vcan0".to_string();
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.bus.channel, "vcan0");
        assert_eq!(loaded.bus.event_queue, config.bus.event_queue);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[bus]\nloopback_echo = true\n").unwrap();
        assert!(config.bus.loopback_echo);
        assert_eq!(config.bus.poll_interval_ms, 100);
        assert!(config.bus.transport_config().loopback_echo);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/cancontrol.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.bus.channel, "can0");
    }
}
