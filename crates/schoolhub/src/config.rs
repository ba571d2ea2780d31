/// Service configuration: JSON file plus environment overrides
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_VAR: &str = "SCHOOLHUB_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub address: String,
    pub port: u16,
    /// SQLite database file
    pub database_path: String,
    /// When set, every `/api` request must carry `Authorization: Bearer <token>`
    pub api_token: Option<String>,
    /// Upper bound on an uploaded workbook
    pub max_upload_bytes: usize,
    /// Largest combined class the distributor creates
    pub max_class_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "schoolhub.db".to_string(),
            api_token: None,
            max_upload_bytes: 10 * 1024 * 1024,
            max_class_size: 35,
        }
    }
}

impl AppConfig {
    /// Loads a configuration file; missing keys take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Builds the configuration from `SCHOOLHUB_CONFIG` (if set) and
    /// `SCHOOLHUB_*` environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::load_from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SCHOOLHUB_ADDR") {
            self.address = v;
        }
        if let Some(v) = lookup("SCHOOLHUB_PORT") {
            self.port = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SCHOOLHUB_PORT",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("SCHOOLHUB_DB_PATH") {
            self.database_path = v;
        }
        if let Some(v) = lookup("SCHOOLHUB_API_TOKEN") {
            self.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("SCHOOLHUB_MAX_CLASS_SIZE") {
            self.max_class_size = match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SCHOOLHUB_MAX_CLASS_SIZE",
                        value: v,
                    })
                }
            };
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
