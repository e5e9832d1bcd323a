//! Error types for the masothue client
//!
//! Domain errors raised by the fetcher, parser and result cache. The
//! unified [`crate::error::Error`] wraps all of them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching a page from the registry site
#[derive(Error, Debug)]
pub enum FetchError {
    /// The page does not exist (HTTP 404)
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// The site refused the request (HTTP 403/429) and the retry budget ran out
    #[error("Blocked by server (HTTP {status}): {url}")]
    Blocked {
        url: String,
        status: u16,
        retry_after: Option<u64>,
    },

    /// Transport failure, timeout, 5xx or unexpected 4xx
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The page carries an anti-bot challenge widget
    #[error("CAPTCHA required at {url} ({marker})")]
    CaptchaRequired { url: String, marker: String },

    /// The URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// URL the error refers to, when known
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::NotFound { url }
            | Self::Blocked { url, .. }
            | Self::Network { url, .. }
            | Self::CaptchaRequired { url, .. } => Some(url),
            Self::InvalidUrl(url) => Some(url),
            Self::Client(_) => None,
        }
    }
}

/// Errors that can occur while extracting data from a document
#[derive(Error, Debug)]
pub enum ParseError {
    /// The document is not a search result or company page at all
    #[error("Unrecognized page: {url}")]
    UnrecognizedPage { url: String },

    /// The server returned a success status with no body
    #[error("Empty document: {url}")]
    EmptyDocument { url: String },
}

/// Errors raised by the on-disk result cache
///
/// These never reach callers of the client; the cache downgrades them to a
/// miss or a skipped write and logs them.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry exists but cannot be decoded
    #[error("Corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Key contains characters that are not safe as a file name
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
