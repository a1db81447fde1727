//! Configuration management for taskmirror
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, CONFIG_GENERATED, DEFAULT_CLIENT_ID_ENV, DEFAULT_CLIENT_SECRET_ENV,
    DEFAULT_IMPORT_INTERVAL_MINUTES, DEFAULT_INITIAL_LOOKBACK_DAYS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STATUS_SYNC_INTERVAL_MINUTES, DEFAULT_TASK_LIST_ID, GOOGLE_TASKS_API, GOOGLE_TASKS_SCOPE,
    GOOGLE_TOKEN_URL, MAX_INTERVAL_MINUTES,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub google: GoogleConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Process-wide switch for both recurring jobs
    pub enabled: bool,
    /// Run the status reconciliation job
    pub status_sync_enabled: bool,
    /// Minutes between status reconciliation ticks
    pub status_sync_interval_minutes: u64,
    /// Run the import job
    pub import_enabled: bool,
    /// Minutes between import ticks
    pub import_interval_minutes: u64,
    /// Per-request timeout for provider calls, in seconds
    pub request_timeout_secs: u64,
    /// How far back an account's first import reaches, in days
    pub initial_lookback_days: i64,
    /// Task list used when creating tasks that have no list yet
    pub default_list_id: String,
}

/// Google Tasks provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Environment variable holding the OAuth client id
    pub client_id_env: String,
    /// Environment variable holding the OAuth client secret
    pub client_secret_env: String,
    pub token_url: String,
    pub api_base_url: String,
    /// Scope an account must have granted to be synced
    pub required_scope: String,
}

/// Local database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// SeaORM database URL. Defaults to a SQLite file in the data directory.
    pub database_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: error, warn, info, debug, trace
    pub level: String,
    /// Also write logs to a file in the data directory
    pub file_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            status_sync_enabled: true,
            status_sync_interval_minutes: DEFAULT_STATUS_SYNC_INTERVAL_MINUTES,
            import_enabled: true,
            import_interval_minutes: DEFAULT_IMPORT_INTERVAL_MINUTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            initial_lookback_days: DEFAULT_INITIAL_LOOKBACK_DAYS,
            default_list_id: DEFAULT_TASK_LIST_ID.to_string(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id_env: DEFAULT_CLIENT_ID_ENV.to_string(),
            client_secret_env: DEFAULT_CLIENT_SECRET_ENV.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base_url: GOOGLE_TASKS_API.to_string(),
            required_scope: GOOGLE_TASKS_SCOPE.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
        }
    }
}

impl SyncConfig {
    pub fn status_sync_interval(&self) -> Duration {
        Duration::from_secs(self.status_sync_interval_minutes * 60)
    }

    pub fn import_interval(&self) -> Duration {
        Duration::from_secs(self.import_interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GoogleConfig {
    /// Read the OAuth client id and secret from the configured environment variables.
    pub fn client_credentials(&self) -> Result<(String, String)> {
        let client_id = std::env::var(&self.client_id_env)
            .with_context(|| format!("OAuth client id not found in env var '{}'", self.client_id_env))?;
        let client_secret = std::env::var(&self.client_secret_env)
            .with_context(|| format!("OAuth client secret not found in env var '{}'", self.client_secret_env))?;
        Ok((client_id, client_secret))
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Some(current_dir_config);
        }

        // 2. Check XDG config directory
        let xdg_config = dirs::config_dir()?.join(APP_DIR_NAME).join("config.toml");
        xdg_config.exists().then_some(xdg_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, minutes) in [
            ("status_sync_interval_minutes", self.sync.status_sync_interval_minutes),
            ("import_interval_minutes", self.sync.import_interval_minutes),
        ] {
            if minutes == 0 || minutes > MAX_INTERVAL_MINUTES {
                anyhow::bail!("{} must be between 1 and {}, got {}", name, MAX_INTERVAL_MINUTES, minutes);
            }
        }

        if self.sync.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.sync.initial_lookback_days < 0 {
            anyhow::bail!("initial_lookback_days cannot be negative");
        }

        if self.sync.default_list_id.trim().is_empty() {
            anyhow::bail!("default_list_id cannot be empty");
        }

        if self.google.required_scope.trim().is_empty() {
            anyhow::bail!("google.required_scope cannot be empty");
        }

        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            anyhow::bail!("Invalid logging level '{}'", self.logging.level);
        }

        Ok(())
    }

    /// Database URL, falling back to a SQLite file in the data directory.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.storage.database_url {
            return Ok(url.clone());
        }

        let data_dir = Self::get_data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(format!("sqlite://{}?mode=rwc", data_dir.join("taskmirror.db").display()))
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        let header = format!(
            "# taskmirror Configuration File\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, header + &toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }

    /// Directory for the database and log file
    pub fn get_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
            .map(|dir| dir.join(APP_DIR_NAME))
    }
}
