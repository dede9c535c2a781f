//! Configuration file support for liftlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Directory holding the persisted collection slots
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Export configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_delimiter: default_csv_delimiter(),
        }
    }
}

impl ExportConfig {
    /// The configured delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.csv_delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(Error::Config(format!(
                "csv_delimiter must be a single ASCII character, got {:?}",
                self.csv_delimiter
            ))),
        }
    }
}

// Default value functions
fn home_or_current_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .unwrap_or_else(|| home_or_current_dir().join(".local/share"));
    base.join("liftlog")
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_csv_delimiter() -> String {
    ",".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.export.delimiter_byte()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_or_current_dir().join(".config"));
        base.join("liftlog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data.data_dir.ends_with("liftlog"));
        assert!(config.data.store_dir().ends_with("liftlog/store"));
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.export.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.logging.level = "debug".into();
        config.data.data_dir = temp_dir.path().join("data");
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.logging.level, "debug");
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[export]
csv_delimiter = ";"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.export.delimiter_byte().unwrap(), b';');
        assert_eq!(config.logging.level, "warn"); // default
    }

    #[test]
    fn test_rejects_multi_char_delimiter() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[export]\ncsv_delimiter = \"::\"\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
