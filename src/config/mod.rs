//! Connection settings for the model service

use crate::paths;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "MODEL_ACL_CONFIG";

/// Connection configuration, built once at startup and read-only afterwards
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the service (e.g. `https://chat.example.com`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// API token sent as a bearer header and as the `token` cookie
    #[serde(default)]
    pub token: Option<String>,

    /// Forward proxy for all requests (e.g. `http://127.0.0.1:8080`)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Global timeout for a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Values supplied on the command line that take precedence over the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces the configured base URL
    pub base_url: Option<String>,
    /// Replaces the configured token
    pub token: Option<String>,
    /// Replaces the configured proxy
    pub proxy: Option<String>,
    /// Replaces the configured timeout
    pub timeout_secs: Option<u64>,
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            proxy: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// The token never shows up in debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.proxy)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from `$MODEL_ACL_CONFIG` or the default location
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Get the configuration file path, honoring `$MODEL_ACL_CONFIG`
    #[must_use]
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        paths::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("model-acl")
            .join("config.json")
    }

    /// Apply command line overrides on top of the loaded values
    #[must_use]
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            base_url: overrides.base_url.or(self.base_url),
            token: overrides.token.or(self.token),
            proxy: overrides.proxy.or(self.proxy),
            timeout_secs: overrides.timeout_secs.unwrap_or(self.timeout_secs),
        }
    }

    /// The configured base URL without a trailing slash
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured
    pub fn base_url(&self) -> Result<&str> {
        let Some(base_url) = self.base_url.as_deref().map(str::trim) else {
            bail!("No base URL configured; pass --base-url or set base_url in the config file");
        };
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("Configured base URL is empty");
        }
        Ok(trimmed)
    }
}
