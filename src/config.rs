//! Configuration management for Chapterwatch.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use crate::transport::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config directory.
const APP_NAME: &str = "Chapterwatch";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global request queue settings.
    pub queue: QueueConfig,

    /// Search aggregation settings.
    pub search: SearchConfig,

    /// Resolution engine settings.
    pub resolve: ResolveConfig,

    /// Web scraping settings.
    pub scraping: ScrapingConfig,
}

/// Request queue configuration.
///
/// At most `interval_cap` tasks start per `interval_ms` window, and at most
/// `concurrency` run at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of tasks running at the same time.
    pub concurrency: usize,

    /// Tasks admitted per interval.
    pub interval_cap: u32,

    /// Interval length in milliseconds.
    pub interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            interval_cap: 20,
            interval_ms: 1000,
        }
    }
}

impl QueueConfig {
    /// A queue admitting `per_second` tasks per second, one at a time.
    pub fn per_second(per_second: u32) -> Self {
        Self {
            concurrency: 1,
            interval_cap: per_second,
            interval_ms: 1000,
        }
    }

    /// Returns the interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Search aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-adapter search timeout in seconds.
    pub timeout_sec: f64,
}

/// Upper bound accepted for `search.timeout_sec`.
const MAX_SEARCH_TIMEOUT_SEC: f64 = 3600.0;

impl Default for SearchConfig {
    fn default() -> Self {
        Self { timeout_sec: 10.0 }
    }
}

impl SearchConfig {
    /// Returns the timeout as a duration, capped at one hour.
    ///
    /// Values that are not a valid duration fall back to the default.
    pub fn timeout(&self) -> Duration {
        let max = Duration::from_secs(MAX_SEARCH_TIMEOUT_SEC as u64);
        match Duration::try_from_secs_f64(self.timeout_sec) {
            Ok(timeout) => timeout.min(max),
            Err(_) if self.timeout_sec > MAX_SEARCH_TIMEOUT_SEC => max,
            Err(_) => Duration::from_secs(10),
        }
    }
}

/// Resolution engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Redirect hops followed before giving up.
    pub max_redirects: u32,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { max_redirects: 5 }
    }
}

/// Web scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Which user agent signature to send.
    pub platform: Platform,

    /// HTTP timeout in seconds.
    pub timeout_sec: u64,

    /// Sites that get a stricter secondary limiter, keyed by site id,
    /// valued in requests per second.
    pub throttled_sites: BTreeMap<String, u32>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        let mut throttled_sites = BTreeMap::new();
        throttled_sites.insert("hiperdex.com".to_string(), 1);

        Self {
            platform: Platform::Desktop,
            timeout_sec: 30,
            throttled_sites,
        }
    }
}

impl ScrapingConfig {
    /// Returns the secondary limiter rate for a site, if one is configured.
    pub fn throttle_for(&self, site_id: &str) -> Option<u32> {
        self.throttled_sites.get(site_id).copied()
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.concurrency == 0 {
            return Err(invalid("queue.concurrency", "must be greater than 0"));
        }
        if self.queue.interval_cap == 0 {
            return Err(invalid("queue.interval_cap", "must be greater than 0"));
        }
        if self.queue.interval_ms == 0 {
            return Err(invalid("queue.interval_ms", "must be greater than 0"));
        }
        let timeout = self.search.timeout_sec;
        if !timeout.is_finite() || timeout <= 0.0 || timeout > MAX_SEARCH_TIMEOUT_SEC {
            return Err(invalid(
                "search.timeout_sec",
                &format!("must be greater than 0 and at most {}", MAX_SEARCH_TIMEOUT_SEC),
            ));
        }
        if let Some((site, _)) = self
            .scraping
            .throttled_sites
            .iter()
            .find(|(_, rate)| **rate == 0)
        {
            return Err(invalid(
                &format!("scraping.throttled_sites.{}", site),
                "rate must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
