//! Configuration management for the masothue client
//!
//! Configuration comes from a TOML file, from `MASOTHUE_*` environment
//! variables, or from defaults. Every section and field is optional in a
//! file; missing values take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::BatchConfig;
use crate::cache::CacheConfig;
use crate::crawler::fetcher::{FetcherConfig, BASE_URL};
use crate::crawler::rate_limiter::RateLimiterConfig;
use crate::utils::retry::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request pacing
    pub rate_limit: RateLimitSection,

    /// Result cache
    pub cache: CacheSection,

    /// HTTP fetching
    pub http: HttpSection,

    /// Batch runs
    pub batch: BatchSection,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Rate limiter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Requests allowed per window
    pub max_requests: usize,

    /// Window length in seconds
    pub time_window_secs: u64,

    /// Minimum gap between requests in seconds
    pub min_delay_secs: f64,

    /// Maximum gap between requests in seconds
    pub max_delay_secs: f64,

    /// Pick the gap at random between min and max
    pub random_delay: bool,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,

    /// Directory holding cache entries
    pub dir: PathBuf,

    /// Entry lifetime in days
    pub expiry_days: u64,

    /// Size budget in megabytes
    pub max_size_mb: u64,

    /// Prune automatically when a write exceeds the budget
    pub auto_prune: bool,
}

/// HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Site root
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base backoff delay in seconds
    pub retry_delay_secs: f64,

    /// Minimum wait after a block response, in seconds
    pub blocked_cooldown_secs: u64,

    /// User agents to rotate through (empty uses the built-in list)
    pub user_agents: Vec<String>,
}

/// Batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Progress channel capacity
    pub channel_capacity: usize,

    /// How long to wait for a slow progress consumer, in seconds
    pub send_timeout_secs: u64,

    /// Abort the run on the first CAPTCHA challenge
    pub stop_on_captcha: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 10,
            time_window_secs: 60,
            min_delay_secs: 1.0,
            max_delay_secs: 3.0,
            random_delay: true,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".cache"),
            expiry_days: 7,
            max_size_mb: 100,
            auto_prune: true,
        }
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            base_url: String::from(BASE_URL),
            timeout_secs: 8,
            max_retries: 2,
            retry_delay_secs: 1.0,
            blocked_cooldown_secs: 30,
            user_agents: Vec::new(),
        }
    }
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            send_timeout_secs: 5,
            stop_on_captcha: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `MASOTHUE_*` environment variables
    pub fn apply_env(&mut self) {
        let rl = &mut self.rate_limit;
        if let Some(v) = env_parse("MASOTHUE_MAX_REQUESTS") {
            rl.max_requests = v;
        }
        if let Some(v) = env_parse("MASOTHUE_TIME_WINDOW") {
            rl.time_window_secs = v;
        }
        if let Some(v) = env_parse("MASOTHUE_MIN_DELAY") {
            rl.min_delay_secs = v;
        }
        if let Some(v) = env_parse("MASOTHUE_MAX_DELAY") {
            rl.max_delay_secs = v;
        }

        let cache = &mut self.cache;
        if let Some(v) = env_bool("MASOTHUE_CACHE_ENABLED") {
            cache.enabled = v;
        }
        if let Ok(v) = std::env::var("MASOTHUE_CACHE_DIR") {
            cache.dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse("MASOTHUE_CACHE_EXPIRY_DAYS") {
            cache.expiry_days = v;
        }
        if let Some(v) = env_parse("MASOTHUE_CACHE_MAX_SIZE_MB") {
            cache.max_size_mb = v;
        }

        let http = &mut self.http;
        if let Ok(v) = std::env::var("MASOTHUE_BASE_URL") {
            http.base_url = v;
        }
        if let Some(v) = env_parse("MASOTHUE_TIMEOUT") {
            http.timeout_secs = v;
        }
        if let Some(v) = env_parse("MASOTHUE_MAX_RETRIES") {
            http.max_retries = v;
        }
        if let Some(v) = env_parse("MASOTHUE_RETRY_DELAY") {
            http.retry_delay_secs = v;
        }

        if let Some(v) = env_bool("MASOTHUE_STOP_ON_CAPTCHA") {
            self.batch.stop_on_captcha = v;
        }

        if let Ok(v) = std::env::var("MASOTHUE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("MASOTHUE_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from a file when given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            anyhow::bail!("rate_limit.max_requests must be greater than 0");
        }

        if self.rate_limit.time_window_secs == 0 {
            anyhow::bail!("rate_limit.time_window_secs must be greater than 0");
        }

        let (min, max) = (self.rate_limit.min_delay_secs, self.rate_limit.max_delay_secs);
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || max < min {
            anyhow::bail!("rate_limit delays must satisfy 0 <= min_delay_secs <= max_delay_secs");
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }

        if !self.http.retry_delay_secs.is_finite() || self.http.retry_delay_secs < 0.0 {
            anyhow::bail!("http.retry_delay_secs must not be negative");
        }

        url::Url::parse(&self.http.base_url)
            .with_context(|| format!("http.base_url is not a valid URL: {}", self.http.base_url))?;

        if self.cache.expiry_days == 0 {
            anyhow::bail!("cache.expiry_days must be greater than 0");
        }

        if self.batch.channel_capacity == 0 {
            anyhow::bail!("batch.channel_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    #[must_use]
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.rate_limit.max_requests,
            time_window: Duration::from_secs(self.rate_limit.time_window_secs),
            min_delay: secs_f64(self.rate_limit.min_delay_secs),
            max_delay: secs_f64(self.rate_limit.max_delay_secs),
            random_delay: self.rate_limit.random_delay,
        }
    }

    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            dir: self.cache.dir.clone(),
            expiry: Duration::from_secs(self.cache.expiry_days.saturating_mul(24 * 60 * 60)),
            max_size_bytes: self.cache.max_size_mb.saturating_mul(1024 * 1024),
            auto_prune: self.cache.auto_prune,
        }
    }

    #[must_use]
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_url: self.http.base_url.clone(),
            request_timeout: self.request_timeout(),
            retry: RetryPolicy::new(self.http.max_retries, secs_f64(self.http.retry_delay_secs)),
            blocked_cooldown: Duration::from_secs(self.http.blocked_cooldown_secs),
            user_agents: self.http.user_agents.clone(),
        }
    }

    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            channel_capacity: self.batch.channel_capacity,
            send_timeout: Duration::from_secs(self.batch.send_timeout_secs),
            stop_on_captcha: self.batch.stop_on_captcha,
        }
    }
}

fn secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}
