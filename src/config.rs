//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fleet REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Realtime push channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_realtime_url")]
    pub url: String,

    #[serde(default = "default_realtime_enabled")]
    pub enabled: bool,
}

fn default_realtime_url() -> String {
    "ws://localhost:5001/ws".to_string()
}

fn default_realtime_enabled() -> bool {
    true
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            enabled: default_realtime_enabled(),
        }
    }
}

/// Where the credential slots live on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_dir")]
    pub dir: String,
}

fn default_session_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("smarthelmet").to_string_lossy().to_string())
        .unwrap_or_else(|| "./smarthelmet_session".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
        }
    }
}

/// Dashboard view configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Bike shown on the dashboard and subscribed on the realtime channel
    #[serde(default = "default_bike_id")]
    pub bike_id: String,

    #[serde(default)]
    pub simulate_status: bool,

    #[serde(default = "default_helmet_toggle")]
    pub helmet_toggle_secs: u64,

    #[serde(default = "default_battery_drain")]
    pub battery_drain_secs: u64,
}

fn default_bike_id() -> String {
    "BIKE123".to_string()
}

fn default_helmet_toggle() -> u64 {
    10
}

fn default_battery_drain() -> u64 {
    30
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bike_id: default_bike_id(),
            simulate_status: false,
            helmet_toggle_secs: default_helmet_toggle(),
            battery_drain_secs: default_battery_drain(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("smarthelmet").join("config.toml")),
            Some(PathBuf::from("/etc/smarthelmet/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SMARTHELMET_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(url) = std::env::var("SMARTHELMET_REALTIME_URL") {
            self.realtime.url = url;
        }
        if let Ok(dir) = std::env::var("SMARTHELMET_SESSION_DIR") {
            self.session.dir = dir;
        }
        if let Ok(bike_id) = std::env::var("SMARTHELMET_BIKE_ID") {
            self.dashboard.bike_id = bike_id;
        }
        if let Ok(level) = std::env::var("SMARTHELMET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SMARTHELMET_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Smart Helmet Console Configuration
#
# Environment variables override these settings:
# - SMARTHELMET_API_URL
# - SMARTHELMET_REALTIME_URL
# - SMARTHELMET_SESSION_DIR
# - SMARTHELMET_BIKE_ID
# - SMARTHELMET_LOG_LEVEL
# - SMARTHELMET_LOG_FORMAT

[api]
# Fleet API base URL
base_url = "http://localhost:5001"

# Request timeout in seconds
request_timeout_secs = 30

[realtime]
# Realtime push endpoint
url = "ws://localhost:5001/ws"

# Connect to the realtime channel after sign-in
enabled = true

[session]
# Directory holding the credential slots
# (defaults to the platform data directory, e.g. ~/.local/share/smarthelmet)
# dir = "/var/lib/smarthelmet"

[dashboard]
# Bike shown on the dashboard
bike_id = "BIKE123"

# Drive the status panel from a local simulator
simulate_status = false
helmet_toggle_secs = 10
battery_drain_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
