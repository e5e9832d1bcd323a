//! HTTP fetcher with rate limiting, retry and anti-bot classification
//!
//! This module provides the single transport used for masothue.com pages:
//! - Every attempt takes one slot from the shared [`RateLimiter`]
//! - Responses are classified as success, terminal or transient
//! - Transient failures are retried with exponential backoff
//! - HTTP 403/429 trigger a cool-down and a user agent rotation
//! - Successful documents are parsed once, checked for CAPTCHA widgets,
//!   then handed to the caller's extractor

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use scraper::Html;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::crawler::captcha::detect_captcha;
use crate::crawler::headers::{build_headers, UserAgentPool};
use crate::crawler::rate_limiter::RateLimiter;
use crate::error::Result;
use crate::utils::error::{FetchError, ParseError};
pub use crate::utils::retry::RetryPolicy;

/// Default site root
pub const BASE_URL: &str = "https://masothue.com";

/// Fetcher settings
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Site root used to resolve relative references
    pub base_url: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Retry budget and backoff
    pub retry: RetryPolicy,

    /// Cool-down after HTTP 403/429 when no `Retry-After` is given
    pub blocked_cooldown: Duration,

    /// Custom user agents (built-in pool when empty)
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            request_timeout: Duration::from_secs(8),
            retry: RetryPolicy::default(),
            blocked_cooldown: Duration::from_secs(30),
            user_agents: Vec::new(),
        }
    }
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub status: u16,
    pub body: String,
}

/// Fetcher counters
#[derive(Debug, Default)]
struct FetchStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    blocked: AtomicU64,
    captchas: AtomicU64,
}

/// Snapshot of fetcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    /// HTTP attempts issued, retries included
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// 403/429 responses seen
    pub blocked: u64,
    pub captchas: u64,
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Done(RawDocument),
    Terminal(FetchError),
    Retry {
        error: FetchError,
        cooldown: Option<Duration>,
    },
}

/// Rate-limited HTTP fetcher for masothue.com
///
/// Cheap to share: wrap in an `Arc` and clone the handle. The underlying
/// connection pool is safe for concurrent use.
pub struct Fetcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    config: FetcherConfig,
    base: Url,
    user_agents: UserAgentPool,
    stats: FetchStats,
}

impl Fetcher {
    /// Create a fetcher sharing the given rate limiter
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for a malformed base URL and
    /// `FetchError::Client` if the HTTP client cannot be created
    pub fn new(config: FetcherConfig, rate_limiter: Arc<RateLimiter>) -> Result<Self, FetchError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            rate_limiter,
            user_agents: UserAgentPool::new(config.user_agents.clone()),
            config,
            base,
            stats: FetchStats::default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Resolve an absolute URL or a site-relative path
    pub fn resolve(&self, reference: &str) -> Result<Url, FetchError> {
        let reference = reference.trim();
        Url::parse(reference)
            .or_else(|_| self.base.join(reference))
            .map_err(|e| FetchError::InvalidUrl(format!("{reference}: {e}")))
    }

    /// Build the search URL for a normalized query
    pub fn search_url(&self, query: &str) -> Result<Url, FetchError> {
        let mut url = self.resolve("/Search/")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "auto");
        Ok(url)
    }

    /// Fetch a page with rate limiting, classification and retry
    ///
    /// # Errors
    ///
    /// - `NotFound` on HTTP 404, after a single attempt
    /// - `Blocked` when 403/429 persist past the retry budget
    /// - `Network` for transport failures, 5xx or other 4xx statuses
    pub async fn fetch(&self, reference: &str) -> Result<RawDocument, FetchError> {
        let url = self.resolve(reference)?;
        let max_attempts = self.config.retry.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            self.rate_limiter.acquire().await;
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            debug!(url = %url, attempt = attempt, "Fetching page");

            match self.attempt(&url).await {
                Attempt::Done(doc) => {
                    self.stats.successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(doc);
                }
                Attempt::Terminal(error) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(error);
                }
                Attempt::Retry { error, cooldown } => {
                    if attempt + 1 < max_attempts {
                        let backoff = self.config.retry.backoff(attempt);
                        let delay = cooldown.map_or(backoff, |c| c.max(backoff));
                        warn!(
                            url = %url,
                            attempt = attempt,
                            max_retries = self.config.retry.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        Err(last_error.unwrap_or_else(|| FetchError::Network {
            url: url.to_string(),
            status: None,
            message: "no attempts were made".to_string(),
        }))
    }

    /// Fetch a page and run `extract` on its parse tree
    ///
    /// The document is parsed once; that tree is used both for CAPTCHA
    /// detection and for extraction.
    pub async fn fetch_parsed<T, F>(&self, reference: &str, extract: F) -> Result<T>
    where
        F: FnOnce(&Html, &str) -> Result<T, ParseError>,
    {
        let doc = self.fetch(reference).await?;
        self.inspect(&doc, extract)
    }

    fn inspect<T, F>(&self, doc: &RawDocument, extract: F) -> Result<T>
    where
        F: FnOnce(&Html, &str) -> Result<T, ParseError>,
    {
        if doc.body.trim().is_empty() {
            return Err(ParseError::EmptyDocument {
                url: doc.final_url.clone(),
            }
            .into());
        }

        let html = Html::parse_document(&doc.body);

        if let Some(marker) = detect_captcha(&html) {
            self.stats.captchas.fetch_add(1, Ordering::Relaxed);
            warn!(url = %doc.final_url, marker = %marker, "CAPTCHA challenge detected");
            return Err(FetchError::CaptchaRequired {
                url: doc.final_url.clone(),
                marker: marker.to_string(),
            }
            .into());
        }

        Ok(extract(&html, &doc.final_url)?)
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        let referer = format!("{}/", self.base.origin().ascii_serialization());
        let headers = build_headers(self.user_agents.current(), &referer);

        let response = match self.client.get(url.clone()).headers(headers).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                return Attempt::Retry {
                    error: FetchError::Network {
                        url: url.to_string(),
                        status: None,
                        message,
                    },
                    cooldown: None,
                };
            }
        };

        let status = response.status();

        if status.is_success() {
            return self.read_body(url, response).await;
        }

        match status {
            StatusCode::NOT_FOUND => Attempt::Terminal(FetchError::NotFound {
                url: url.to_string(),
            }),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                self.stats.blocked.fetch_add(1, Ordering::Relaxed);
                let retry_after = parse_retry_after(&response);
                let cooldown = self.cooldown_for(status, retry_after);
                let agent = self.user_agents.rotate();
                debug!(user_agent = %agent, "Rotated user agent after block");

                Attempt::Retry {
                    error: FetchError::Blocked {
                        url: url.to_string(),
                        status: status.as_u16(),
                        retry_after: retry_after.map(|d| d.as_secs()),
                    },
                    cooldown: Some(cooldown),
                }
            }
            s if s.is_server_error() => Attempt::Retry {
                error: FetchError::Network {
                    url: url.to_string(),
                    status: Some(s.as_u16()),
                    message: format!("server error {s}"),
                },
                cooldown: None,
            },
            s => Attempt::Terminal(FetchError::Network {
                url: url.to_string(),
                status: Some(s.as_u16()),
                message: format!("unexpected status {s}"),
            }),
        }
    }

    async fn read_body(&self, url: &Url, response: Response) -> Attempt {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        match response.text().await {
            Ok(body) => Attempt::Done(RawDocument {
                url: url.to_string(),
                final_url,
                status,
                body,
            }),
            Err(e) => Attempt::Retry {
                error: FetchError::Network {
                    url: url.to_string(),
                    status: Some(status),
                    message: format!("failed to read body: {e}"),
                },
                cooldown: None,
            },
        }
    }

    /// `Retry-After` wins; a 403 waits at least the configured cool-down
    fn cooldown_for(&self, status: StatusCode, retry_after: Option<Duration>) -> Duration {
        let fallback = self.config.blocked_cooldown;
        match (status, retry_after) {
            (StatusCode::FORBIDDEN, Some(d)) => d.max(fallback),
            (_, Some(d)) => d,
            (_, None) => fallback,
        }
    }

    /// Snapshot of fetcher counters
    pub fn metrics(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            successes: self.stats.successes.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            blocked: self.stats.blocked.load(Ordering::Relaxed),
            captchas: self.stats.captchas.load(Ordering::Relaxed),
        }
    }
}

/// Read `Retry-After` as delta-seconds or an HTTP date
fn parse_retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?.trim();
    parse_retry_after_value(value)
}

fn parse_retry_after_value(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = when.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::rate_limiter::RateLimiterConfig;

    fn fetcher() -> Fetcher {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
        Fetcher::new(FetcherConfig::default(), limiter).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let fetcher = fetcher();
        assert_eq!(
            fetcher.resolve("/3604062974-cong-ty-abc").unwrap().as_str(),
            "https://masothue.com/3604062974-cong-ty-abc"
        );
        assert_eq!(
            fetcher.resolve("https://example.org/x").unwrap().as_str(),
            "https://example.org/x"
        );
    }

    #[test]
    fn test_search_url_encodes_query() {
        let fetcher = fetcher();
        let url = fetcher.search_url("công ty ABC").unwrap();
        assert!(url.as_str().starts_with("https://masothue.com/Search/?q="));
        assert!(url.as_str().ends_with("&type=auto"));
        let q: Vec<_> = url.query_pairs().collect();
        assert_eq!(q[0].1, "công ty ABC");
    }

    #[test]
    fn test_invalid_base_url() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
        let config = FetcherConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            Fetcher::new(config, limiter),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_retry_after_value() {
        assert_eq!(parse_retry_after_value("12"), Some(Duration::from_secs(12)));
        assert_eq!(
            parse_retry_after_value("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after_value("soon"), None);
    }

    #[test]
    fn test_cooldown_rules() {
        let fetcher = fetcher();
        let base = fetcher.config.blocked_cooldown;
        assert_eq!(fetcher.cooldown_for(StatusCode::TOO_MANY_REQUESTS, None), base);
        assert_eq!(
            fetcher.cooldown_for(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            fetcher.cooldown_for(StatusCode::FORBIDDEN, Some(Duration::from_secs(2))),
            base
        );
    }

    #[test]
    fn test_inspect_detects_captcha_before_extracting() {
        let fetcher = fetcher();
        let doc = RawDocument {
            url: "https://masothue.com/x".into(),
            final_url: "https://masothue.com/x".into(),
            status: 200,
            body: r#"<html><body><div class="g-recaptcha"></div></body></html>"#.into(),
        };

        let mut called = false;
        let result = fetcher.inspect(&doc, |_, _| {
            called = true;
            Ok(())
        });

        assert!(!called);
        assert!(matches!(
            result,
            Err(crate::error::Error::Fetch(FetchError::CaptchaRequired { .. }))
        ));
        assert_eq!(fetcher.metrics().captchas, 1);
    }

    #[test]
    fn test_inspect_empty_body() {
        let fetcher = fetcher();
        let doc = RawDocument {
            url: "u".into(),
            final_url: "u".into(),
            status: 200,
            body: "  ".into(),
        };
        let result = fetcher.inspect(&doc, |_, _| Ok(()));
        assert!(matches!(
            result,
            Err(crate::error::Error::Parse(ParseError::EmptyDocument { .. }))
        ));
    }
}
