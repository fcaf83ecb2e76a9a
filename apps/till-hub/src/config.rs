//! # Hub Configuration
//!
//! Layered configuration for the drawer hub.
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Configuration Layers                               │
//! │                                                                         │
//! │  1. Defaults (HubConfig::default)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. till.toml (--config path, or the platform config dir)              │
//! │     • macOS: ~/Library/Application Support/com.till.hub/till.toml      │
//! │     • Linux: ~/.config/till-hub/till.toml                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Environment overrides                                              │
//! │     • TILL_DB_PATH             database file                           │
//! │     • TILL_DB_MAX_CONNECTIONS  pool size                               │
//! │     • TILL_LOG                 tracing filter                          │
//! │     • TILL_DEFAULT_FLOAT       opening float, e.g. "200.00"            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. validate()                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! [database]
//! path = "/var/lib/till/till.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,till=debug,sqlx=warn"
//!
//! [drawer]
//! default_opening_float_cents = 20000
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use till_core::validation::validate_opening_float;
use till_core::Money;

/// Default tracing filter when neither RUST_LOG nor config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,till=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No platform data directory and no explicit database path.
    #[error("Could not determine app data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `till.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive string. RUST_LOG still wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

/// Drawer defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerSettings {
    /// Float used by `open` when none is given.
    #[serde(default)]
    pub default_opening_float_cents: i64,
}

// =============================================================================
// HubConfig
// =============================================================================

/// Complete hub configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub drawer: DrawerSettings,
}

impl HubConfig {
    /// Loads defaults, then the config file, then environment overrides,
    /// then validates.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// `load` with overrides read from `var` instead of the process
    /// environment.
    fn load_with(
        config_path: Option<PathBuf>,
        var: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading hub config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(var);
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }

        validate_opening_float(self.default_opening_float())
            .map_err(|e| ConfigError::Invalid(format!("drawer.default_opening_float_cents: {}", e)))?;

        Ok(())
    }

    /// Applies overrides from any key lookup. Unparseable values are
    /// logged and ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = var("TILL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TILL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(filter) = var("TILL_LOG") {
            self.logging.filter = filter;
        }

        if let Some(float) = var("TILL_DEFAULT_FLOAT") {
            match float.parse::<Money>() {
                Ok(m) => self.drawer.default_opening_float_cents = m.cents(),
                Err(e) => warn!(value = %float, error = %e, "Ignoring invalid TILL_DEFAULT_FLOAT"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("till.toml"))
    }

    /// Resolves the database file, creating the platform data dir if it
    /// is used.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir: &Path = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("till.db"))
    }

    /// Float used by `open` when none is given.
    pub fn default_opening_float(&self) -> Money {
        Money::from_cents(self.drawer.default_opening_float_cents)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "till", "hub")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.default_opening_float().is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HubConfig::from_toml(
            r#"
            [drawer]
            default_opening_float_cents = 20000
            "#,
        )
        .unwrap();

        assert_eq!(config.default_opening_float().cents(), 20000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.path, None);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            HubConfig::from_toml("[database\nmax_connections = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = HubConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.drawer.default_opening_float_cents = -100;
        assert!(config.validate().is_err());

        config.drawer.default_opening_float_cents = 0;
        config.logging.filter = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TILL_DB_PATH", "/tmp/till-test.db"),
            ("TILL_DB_MAX_CONNECTIONS", "not-a-number"),
            ("TILL_LOG", "debug"),
            ("TILL_DEFAULT_FLOAT", "150.25"),
        ]
        .into_iter()
        .collect();

        let mut config = HubConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/till-test.db")));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.default_opening_float().cents(), 15025);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/till-test.db")
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("till-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nmax_connections = 2\n").unwrap();

        let from_file = HubConfig::load_with(Some(path.clone()), |_| None);
        let overridden = HubConfig::load_with(Some(path.clone()), |key| {
            (key == "TILL_DB_MAX_CONNECTIONS").then(|| "7".to_string())
        });
        let invalid = HubConfig::load_with(Some(path.clone()), |key| {
            (key == "TILL_DB_MAX_CONNECTIONS").then(|| "0".to_string())
        });
        std::fs::remove_file(&path).unwrap();

        assert_eq!(from_file.unwrap().database.max_connections, 2);
        assert_eq!(overridden.unwrap().database.max_connections, 7);
        assert!(matches!(invalid, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("till-missing-{}.toml", uuid::Uuid::new_v4()));
        let config = HubConfig::load_with(Some(path), |_| None).unwrap();
        assert_eq!(config, HubConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = HubConfig::default();
        config.database.path = Some(PathBuf::from("/data/till.db"));
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[database]"));
        assert_eq!(HubConfig::from_toml(&rendered).unwrap(), config);
    }
}
