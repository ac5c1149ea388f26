use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Primary environment variable naming the controller home directory
pub const HOME_ENV: &str = "MESH_HOME";

/// Legacy home directory variable, consulted when `MESH_HOME` is unset
pub const LEGACY_HOME_ENV: &str = "ZT_HOME";

/// Home directory used when neither home variable is set
pub const FALLBACK_HOME: &str = ".";

/// Default validity window of issued credentials (30 minutes, in milliseconds)
pub const DEFAULT_CREDENTIAL_DELTA_MS: i64 = 1000 * 60 * 30;

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidEnvVar(String, String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// What the controller does when the authorization oracle fails to initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleInitPolicy {
    /// Log the failure and keep serving; the oracle decides how to answer
    #[default]
    Continue,
    /// Refuse to construct the controller
    Fail,
}

impl FromStr for OracleInitPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(OracleInitPolicy::Continue),
            "fail" => Ok(OracleInitPolicy::Fail),
            other => Err(ConfigError::InvalidEnvVar(
                "MESH_ORACLE_INIT_POLICY".to_string(),
                other.to_string(),
            )),
        }
    }
}

impl fmt::Display for OracleInitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleInitPolicy::Continue => write!(f, "continue"),
            OracleInitPolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    #[serde(default = "default_home_path")]
    pub home_path: PathBuf,
    #[serde(default)]
    pub oracle_init_policy: OracleInitPolicy,
    #[serde(default = "default_credential_delta_ms")]
    pub credential_delta_ms: i64,
    #[serde(default = "default_whitelist_file")]
    pub whitelist_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_home_path() -> PathBuf {
    resolve_home_path()
}

fn default_credential_delta_ms() -> i64 {
    DEFAULT_CREDENTIAL_DELTA_MS
}

fn default_whitelist_file() -> String {
    "controller.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings {
            home_path: default_home_path(),
            oracle_init_policy: OracleInitPolicy::default(),
            credential_delta_ms: default_credential_delta_ms(),
            whitelist_file: default_whitelist_file(),
            log_level: default_log_level(),
        }
    }
}

/// Resolve the controller home directory from the process environment
pub fn resolve_home_path() -> PathBuf {
    resolve_home_with(|key| env::var(key).ok())
}

fn resolve_home_with<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(HOME_ENV)
        .filter(|v| !v.is_empty())
        .or_else(|| lookup(LEGACY_HOME_ENV).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_HOME))
}

impl ControllerSettings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // A configuration file takes precedence over individual variables
        if let Some(config_path) = lookup("MESH_CONFIG_FILE") {
            if Path::new(&config_path).exists() {
                debug!("loading controller settings from {}", config_path);
                return Self::from_file(&config_path);
            }
            return Err(ConfigError::FileNotFound(config_path));
        }

        let home_path = resolve_home_with(&lookup);

        let oracle_init_policy = match lookup("MESH_ORACLE_INIT_POLICY") {
            Some(v) => v.parse::<OracleInitPolicy>()?,
            None => OracleInitPolicy::default(),
        };

        let credential_delta_ms = match lookup("MESH_CREDENTIAL_DELTA_MS") {
            Some(v) => v.trim().parse::<i64>().map_err(|e| {
                ConfigError::InvalidEnvVar("MESH_CREDENTIAL_DELTA_MS".to_string(), e.to_string())
            })?,
            None => default_credential_delta_ms(),
        };

        let whitelist_file = lookup("MESH_WHITELIST_FILE").unwrap_or_else(default_whitelist_file);
        let log_level = lookup("MESH_LOG_LEVEL").unwrap_or_else(default_log_level);

        let settings = ControllerSettings {
            home_path,
            oracle_init_policy,
            credential_delta_ms,
            whitelist_file,
            log_level,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("Failed to read {}: {}", path, e)))?;

        let settings: ControllerSettings = serde_yaml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.credential_delta_ms <= 0 {
            return Err(ConfigError::InvalidSetting(format!(
                "credential_delta_ms must be positive, got {}",
                self.credential_delta_ms
            )));
        }
        if self.whitelist_file.is_empty() {
            return Err(ConfigError::InvalidSetting("whitelist_file is empty".to_string()));
        }
        Ok(())
    }

    /// Full path of the whitelist file inside the home directory
    pub fn whitelist_path(&self) -> PathBuf {
        self.home_path.join(&self.whitelist_file)
    }
}
