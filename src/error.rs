//! Unified error handling for the masothue crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, plus the closed
//! [`ErrorKind`] taxonomy that batch outcomes and user interfaces report.
//!
//! # Architecture
//!
//! - [`MasothueErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorKind`] - Closed classification of failures
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use masothue::error::{Error, ErrorKind, MasothueErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     match err.kind() {
//!         ErrorKind::CaptchaRequired => eprintln!("{}", err.localized_desc()),
//!         _ if err.is_recoverable() => println!("Transient: {err}"),
//!         _ => eprintln!("Fatal error: {err}"),
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub use crate::utils::error::{CacheError, FetchError, ParseError};

/// Common trait for all masothue error types
pub trait MasothueErrorTrait: std::error::Error {
    /// Check if this error is transient (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get localized description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the failure kind
    fn kind(&self) -> ErrorKind;
}

/// Closed taxonomy of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input shape, caught before any network call
    Validation,
    /// The requested page does not exist
    NotFound,
    /// The site refused the request after cool-down and retries
    Blocked,
    /// Transport failure after retries
    Network,
    /// Anti-bot challenge detected
    CaptchaRequired,
    /// Result cache failure (internal only)
    Cache,
    /// The document could not be interpreted
    Parse,
    /// Failure outside the lookup pipeline (configuration, local I/O)
    Internal,
}

impl ErrorKind {
    /// Get localized description for the kind
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Validation => crate::i18n::t!("errors.kind.validation").to_string(),
            Self::NotFound => crate::i18n::t!("errors.kind.not_found").to_string(),
            Self::Blocked => crate::i18n::t!("errors.kind.blocked").to_string(),
            Self::Network => crate::i18n::t!("errors.kind.network").to_string(),
            Self::CaptchaRequired => crate::i18n::t!("errors.kind.captcha").to_string(),
            Self::Cache => crate::i18n::t!("errors.kind.cache").to_string(),
            Self::Parse => crate::i18n::t!("errors.kind.parse").to_string(),
            Self::Internal => crate::i18n::t!("errors.kind.internal").to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Blocked => "blocked",
            Self::Network => "network",
            Self::CaptchaRequired => "captcha_required",
            Self::Cache => "cache",
            Self::Parse => "parse",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MasothueErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Blocked { .. } | Self::Network { .. })
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::NotFound { url } => crate::i18n::t!("errors.fetch.not_found", url = url).to_string(),
            Self::Blocked { url, status, .. } => {
                crate::i18n::t!("errors.fetch.blocked", url = url, status = status).to_string()
            }
            Self::Network { url, message, .. } => {
                crate::i18n::t!("errors.fetch.network", url = url, message = message).to_string()
            }
            Self::CaptchaRequired { url, .. } => {
                crate::i18n::t!("errors.fetch.captcha", url = url).to_string()
            }
            Self::InvalidUrl(url) => crate::i18n::t!("errors.fetch.invalid_url", url = url).to_string(),
            Self::Client(e) => format!("{}: {e}", crate::i18n::t!("errors.http.error")),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Blocked { .. } => ErrorKind::Blocked,
            Self::Network { .. } | Self::Client(_) => ErrorKind::Network,
            Self::CaptchaRequired { .. } => ErrorKind::CaptchaRequired,
            Self::InvalidUrl(_) => ErrorKind::Validation,
        }
    }
}

impl MasothueErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::UnrecognizedPage { url } => {
                crate::i18n::t!("errors.parse.unrecognized", url = url).to_string()
            }
            Self::EmptyDocument { url } => crate::i18n::t!("errors.parse.empty", url = url).to_string(),
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

impl MasothueErrorTrait for CacheError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn localized_desc(&self) -> String {
        format!("{}: {self}", crate::i18n::t!("errors.kind.cache"))
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Cache
    }
}

/// Unified error type for the masothue crate
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any network access
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl MasothueErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Cache(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Validation(msg) => {
                format!("{}: {msg}", crate::i18n::t!("errors.kind.validation"))
            }
            Self::Fetch(e) => e.localized_desc(),
            Self::Parse(e) => e.localized_desc(),
            Self::Cache(e) => e.localized_desc(),
            Self::Io(e) => format!("{}: {e}", crate::i18n::t!("errors.io.error")),
            Self::Json(e) => format!("{}: {e}", crate::i18n::t!("errors.json.error")),
            Self::Http(e) => format!("{}: {e}", crate::i18n::t!("errors.http.error")),
            Self::Config(msg) => format!("{}: {msg}", crate::i18n::t!("errors.config.error")),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Fetch(e) => e.kind(),
            Self::Parse(_) | Self::Json(_) => ErrorKind::Parse,
            Self::Cache(_) => ErrorKind::Cache,
            Self::Http(_) => ErrorKind::Network,
            Self::Io(_) | Self::Config(_) | Self::Other { .. } => ErrorKind::Internal,
        }
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
