use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::page_cache::CachePolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote feed endpoint parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Seconds a cached page stays fresh.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_max_cached_pages")]
    pub max_cached_pages: usize,

    /// Where the page cache snapshot lives; `None` keeps the cache in
    /// memory only.
    #[serde(default = "default_cache_file", skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds between successive load-more fetches.
    #[serde(default = "default_min_load_interval")]
    pub min_load_interval_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_base_url() -> String {
    "https://newsapi.org".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_timeout() -> u64 {
    30
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_max_cached_pages() -> usize {
    5
}

fn default_cache_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("newsdeck").join("pages.json"))
}

fn default_min_load_interval() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            country: default_country(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_cached_pages: default_max_cached_pages(),
            cache_file: default_cache_file(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_load_interval_secs: default_min_load_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl CacheSettings {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.ttl_secs),
            max_cached_pages: self.max_cached_pages,
        }
    }
}

impl SessionConfig {
    pub fn min_load_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_load_interval_secs)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::NotFound(path.as_ref().display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.feed.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.feed.base_url.clone()))?;

        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid(
                "Page size must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }

        if self.cache.max_cached_pages == 0 {
            return Err(ConfigError::Invalid(
                "Max cached pages must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("NEWSDECK_API_KEY") {
            self.feed.api_key = key;
        }

        if let Ok(level) = std::env::var("NEWSDECK_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(ttl) = std::env::var("NEWSDECK_CACHE_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                self.cache.ttl_secs = val;
            }
        }

        if let Ok(country) = std::env::var("NEWSDECK_COUNTRY") {
            self.feed.country = country;
        }
    }
}

/// Install a global tracing subscriber honoring the configured level.
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.json_format {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}
