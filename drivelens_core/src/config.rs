use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Runtime settings for the Drive engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub request_timeout_secs: u64,
    /// Cap on candidates shown when only similar names match.
    pub similar_limit: usize,
    pub default_list_limit: u32,
    pub default_search_results: u32,
    /// Read a lone exact-name match instead of listing it.
    pub auto_read_single_match: bool,
    pub user_agent: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            similar_limit: 10,
            default_list_limit: 25,
            default_search_results: 10,
            auto_read_single_match: false,
            user_agent: format!("drivelens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DriveConfig {
    /// Defaults, then `$DRIVELENS_CONFIG` (TOML) when set, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("DRIVELENS_CONFIG") {
            Ok(path) if !path.is_empty() => Self::load_from_path(path)?,
            _ => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply `DRIVELENS_*` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DRIVELENS_DRIVE_API_BASE").filter(|v| !v.is_empty()) {
            self.api_base = v;
        }
        if let Some(v) = lookup("DRIVELENS_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("DRIVELENS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DRIVELENS_SIMILAR_LIMIT") {
            self.similar_limit = parse_env("DRIVELENS_SIMILAR_LIMIT", &v)?;
        }
        if let Some(v) = lookup("DRIVELENS_AUTO_READ_SINGLE") {
            self.auto_read_single_match = matches!(v.trim(), "1" | "true" | "yes");
        }
        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}
