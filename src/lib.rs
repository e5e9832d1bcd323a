//! masothue - Vietnamese tax registry lookup client
//!
//! Retrieves structured business-registry records from masothue.com by tax
//! identifier or company name, shielding callers from network instability,
//! anti-bot defenses and redundant fetches.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Tax identifiers, queries, search hits and company records
//! - [`error`] - Error taxonomy shared by every layer
//! - [`crawler`] - Rate limiter, fetcher and CAPTCHA detection
//! - [`parser`] - HTML extraction for search and detail pages
//! - [`cache`] - Durable, expiring result cache
//! - [`client`] - Search, detail and lookup operations
//! - [`batch`] - Background runs over many queries with progress and cancel
//! - [`config`] - Configuration management and settings
//! - [`format`] - Human-readable output
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use masothue::client::Client;
//! use masothue::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = Client::from_config(&config)?;
//!     if let Some(record) = client.lookup("3604062974").await? {
//!         println!("{:?}", record.name);
//!     }
//!     Ok(())
//! }
//! ```

// Initialize rust-i18n at crate root level
rust_i18n::i18n!("locales", fallback = "en");

pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod format;
pub mod i18n;
pub mod models;
pub mod parser;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::{BatchConfig, BatchCoordinator, BatchReport, ItemOutcome, JobState};
    pub use crate::cache::{CacheConfig, ResultCache};
    pub use crate::client::{Client, CompanyLookup};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorKind, MasothueErrorTrait, Result};
    pub use crate::models::{CompanyRecord, CompanyStatus, Query, SearchHit, TaxId};
}

// Direct re-exports for convenience
pub use models::{CompanyRecord, CompanyStatus, Query, SearchHit, TaxId};
