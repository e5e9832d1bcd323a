//! High-level lookup client
//!
//! [`Client`] ties the fetcher, parser and result cache together:
//!
//! - [`Client::search`] always goes to the network
//! - [`Client::get_details`] is served from the cache when a fresh entry exists
//! - [`Client::lookup`] searches, picks the best hit and fetches its details
//!
//! All methods take `&self`; one client can serve many concurrent tasks.
//! The rate limiter is shared by every request the client makes.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::cache::{CacheKey, ResultCache};
use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::rate_limiter::RateLimiter;
use crate::error::{Error, Result};
use crate::models::{CompanyRecord, Query, SearchHit, TaxId};
use crate::parser::{parse_detail, parse_search_page, SearchPage};

lazy_static! {
    /// Tax identifier leading the last path segment of a detail URL
    static ref DETAIL_PATH_TAX_ID: Regex =
        Regex::new(r"^(\d{8,15}(?:-\d{3})?)(?:-|$)").expect("Invalid regex pattern");
}

/// Lookup operations, as seen by callers that only need records
///
/// [`BatchCoordinator`](crate::batch::BatchCoordinator) works against this
/// trait so runs can be driven by any source of records.
#[async_trait]
pub trait CompanyLookup: Send + Sync {
    /// Candidate matches for a name or tax identifier, in page order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Full record behind a detail reference (absolute URL or site path)
    async fn get_details(&self, reference: &str) -> Result<CompanyRecord>;

    /// Search, pick the best hit and resolve it to a full record
    ///
    /// Returns `Ok(None)` when the search has no hits.
    async fn lookup(&self, query: &str) -> Result<Option<CompanyRecord>> {
        let parsed = Query::parse(query)?;
        let hits = self.search(query).await?;

        let Some(hit) = select_hit(&hits, parsed.tax_id()) else {
            debug!(query = %parsed, "No search hits");
            return Ok(None);
        };

        match &hit.reference {
            Some(reference) => self.get_details(reference).await.map(Some),
            None => Ok(Some(CompanyRecord::from_hit(hit))),
        }
    }
}

/// Pick the hit a lookup resolves to
///
/// For a tax identifier query, the first hit with exactly that identifier in
/// document order; otherwise (or when none matches) the first hit.
pub fn select_hit<'a>(hits: &'a [SearchHit], tax_id: Option<&TaxId>) -> Option<&'a SearchHit> {
    tax_id
        .and_then(|id| hits.iter().find(|hit| hit.matches(id)))
        .or_else(|| hits.first())
}

/// masothue.com lookup client
#[derive(Clone)]
pub struct Client {
    fetcher: Arc<Fetcher>,
    cache: Arc<ResultCache>,
}

impl Client {
    pub fn new(fetcher: Arc<Fetcher>, cache: Arc<ResultCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Build a client with its own rate limiter, fetcher and cache
    pub fn from_config(config: &Config) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limiter_config()));
        let fetcher = Fetcher::new(config.fetcher_config(), limiter)?;
        let cache = ResultCache::new(config.cache_config());

        Ok(Self::new(Arc::new(fetcher), Arc::new(cache)))
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Search the registry
    ///
    /// For a tax identifier query, hits carrying exactly that identifier are
    /// moved to the front; relative order is otherwise kept. When the site
    /// answers with a company page instead of a listing, its record is
    /// cached so a following detail lookup needs no request.
    #[instrument(skip(self), fields(query = %raw))]
    pub async fn search(&self, raw: &str) -> Result<Vec<SearchHit>> {
        let query = Query::parse(raw)?;
        let url = self.fetcher.search_url(query.as_str())?;

        let page = self
            .fetcher
            .fetch_parsed(url.as_str(), |doc, final_url| Ok(parse_search_page(doc, final_url)))
            .await?;

        if let SearchPage::Company(record) = &page {
            if let Some(id) = &record.tax_id {
                self.cache.put(&CacheKey::for_tax_id(id), record).await;
            }
        }

        let mut hits = page.into_hits();
        if let Some(id) = query.tax_id() {
            hits.sort_by_key(|hit| !hit.matches(id));
        }

        info!(query = %query, hits = hits.len(), "Search completed");
        Ok(hits)
    }

    /// Fetch the full record behind a detail reference
    ///
    /// A fresh cache entry is returned without touching the network.
    #[instrument(skip(self))]
    pub async fn get_details(&self, reference: &str) -> Result<CompanyRecord> {
        if reference.trim().is_empty() {
            return Err(Error::validation("detail reference is empty"));
        }

        let url = self.fetcher.resolve(reference)?;
        let lookup_key = reference_key(&url);

        if let Some(record) = self.cache.get(&lookup_key).await {
            debug!(url = %url, key = %lookup_key, "Cache hit");
            return Ok(record);
        }

        let record = self.fetcher.fetch_parsed(url.as_str(), parse_detail).await?;

        let store_key = record
            .tax_id
            .as_ref()
            .map(CacheKey::for_tax_id)
            .unwrap_or_else(|| CacheKey::for_reference(url.as_str()));
        self.cache.put(&store_key, &record).await;

        info!(url = %url, tax_id = ?record.tax_id, "Detail fetched");
        Ok(record)
    }

    /// Search and resolve the best hit to a full record
    pub async fn lookup(&self, query: &str) -> Result<Option<CompanyRecord>> {
        CompanyLookup::lookup(self, query).await
    }
}

#[async_trait]
impl CompanyLookup for Client {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Client::search(self, query).await
    }

    async fn get_details(&self, reference: &str) -> Result<CompanyRecord> {
        Client::get_details(self, reference).await
    }
}

/// Cache key a detail URL is looked up under
///
/// Detail URLs start their last path segment with the tax identifier, so the
/// entry stored under the record's tax identifier is found before fetching.
/// Other references fall back to a hash of the URL.
pub fn reference_key(url: &Url) -> CacheKey {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .and_then(|segment| DETAIL_PATH_TAX_ID.captures(segment))
        .and_then(|caps| TaxId::parse(&caps[1]).ok())
        .map(|id| CacheKey::for_tax_id(&id))
        .unwrap_or_else(|| CacheKey::for_reference(url.as_str()))
}
