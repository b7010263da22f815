// src/config.rs

//! Application settings.
//!
//! Settings are read once at process start from a TOML file and passed into
//! each component by value; nothing reads them implicitly afterwards.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Also fetch and embed thumbnail images in each record
    #[serde(default)]
    pub download_thumbnails: bool,

    /// Apply zlib compression to archived records
    #[serde(default)]
    pub compress: bool,

    /// Remote site origin that all page URLs are resolved against
    #[serde(default = "defaults::origin")]
    pub origin: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Size of the shared worker pool capping in-flight I/O
    #[serde(default = "defaults::pool_size")]
    pub pool_size: usize,

    /// How many pages to process between checkpoint saves
    #[serde(default = "defaults::pages_per_checkpoint")]
    pub pages_per_checkpoint: u32,

    /// Retry behavior for page and thumbnail fetches
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry behavior for a single fetch call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts; omit for unbounded retry
    #[serde(default = "defaults::max_tries")]
    pub max_tries: Option<u32>,

    /// Delay between attempts in milliseconds
    #[serde(default = "defaults::retry_wait")]
    pub wait_ms: u64,
}

impl RetrySettings {
    /// Delay between attempts as a [`Duration`].
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_tries: defaults::max_tries(),
            wait_ms: defaults::retry_wait(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings or return defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Settings load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate settings values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() || !self.origin.starts_with("http") {
            return Err(AppError::config("origin must be an http(s) URL"));
        }
        if self.origin.ends_with('/') {
            return Err(AppError::config("origin must not end with '/'"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::config("timeout_secs must be > 0"));
        }
        if self.pool_size == 0 {
            return Err(AppError::config("pool_size must be > 0"));
        }
        if self.pages_per_checkpoint == 0 {
            return Err(AppError::config("pages_per_checkpoint must be > 0"));
        }
        if self.retry.max_tries == Some(0) {
            return Err(AppError::config("retry.max_tries must be > 0 if set"));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_thumbnails: false,
            compress: false,
            origin: defaults::origin(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            pool_size: defaults::pool_size(),
            pages_per_checkpoint: defaults::pages_per_checkpoint(),
            retry: RetrySettings::default(),
        }
    }
}

mod defaults {
    pub fn origin() -> String {
        "https://www.kongregate.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; kongarc/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn pool_size() -> usize {
        10
    }
    pub fn pages_per_checkpoint() -> u32 {
        10
    }
    pub fn max_tries() -> Option<u32> {
        Some(10)
    }
    pub fn retry_wait() -> u64 {
        100
    }
}
