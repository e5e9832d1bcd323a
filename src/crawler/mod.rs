//! HTTP access to masothue.com
//!
//! - [`rate_limiter`]: sliding-window limiter shared by every request
//! - [`fetcher`]: rate-limited GET with classification and retry
//! - [`captcha`]: anti-bot challenge detection on parsed pages
//! - [`headers`]: browser-like request headers and user agent rotation

pub mod captcha;
pub mod fetcher;
pub mod headers;
pub mod rate_limiter;

pub use captcha::{detect_captcha, CaptchaMarker};
pub use fetcher::{FetchStatsSnapshot, Fetcher, FetcherConfig, RawDocument, RetryPolicy, BASE_URL};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterMetrics};
