use std::path::{Path, PathBuf};

use dwp_common::config::SystemConfig;

use super::validation;

/// Complete engine configuration: the typed system config plus the
/// database connection parameters assembled from environment
/// variables (`DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`,
/// `DB_DATABASE`).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub system: SystemConfig,
    pub database_url: String,
    #[allow(dead_code)]
    pub config_path: PathBuf,
}

/// Loads and validates configuration from `config_path`. The engine
/// refuses to start on a validation failure.
pub fn load_config(config_path: &Path) -> Result<EngineConfig, ConfigError> {
    tracing::info!(config_path = %config_path.display(), "Loading configuration");

    let system = load_system_config(config_path)?;
    let database_url = load_database_url()?;

    let config = EngineConfig {
        system,
        database_url,
        config_path: config_path.to_path_buf(),
    };

    validation::validate(&config)?;

    tracing::info!("Configuration loaded successfully");
    Ok(config)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using built-in defaults");
        return Ok(SystemConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn load_database_url() -> Result<String, ConfigError> {
    let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let username = std::env::var("DB_USERNAME").map_err(|_| ConfigError::Validation("DB_USERNAME is not set".to_string()))?;
    let password = std::env::var("DB_PASSWORD").map_err(|_| ConfigError::Validation("DB_PASSWORD is not set".to_string()))?;
    let database = std::env::var("DB_DATABASE").map_err(|_| ConfigError::Validation("DB_DATABASE is not set".to_string()))?;

    Ok(format!("postgres://{username}:{password}@{host}:{port}/{database}"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for dwp_common::DwpError {
    fn from(e: ConfigError) -> Self {
        dwp_common::DwpError::Config(e.to_string())
    }
}
