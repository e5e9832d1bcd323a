//! HTML parsing and data extraction
//!
//! This module turns masothue.com documents into [`SearchHit`] lists and
//! [`CompanyRecord`] values. Extraction is layered: semantic hooks
//! (`itemprop` attributes, info-table rows) first, label-text matching as
//! the fallback, configured per field in [`selectors::DETAIL_RULES`].
//!
//! [`SearchHit`]: crate::models::SearchHit
//! [`CompanyRecord`]: crate::models::CompanyRecord

pub mod detail;
pub mod sanitize;
pub mod search;
pub mod selectors;
pub mod strategy;

pub use detail::parse_detail;
pub use search::{parse_search, parse_search_page, SearchPage};
pub use selectors::Field;
pub use strategy::Strategy;

/// Parse raw HTML into search hits
pub fn parse_search_html(html: &str, page_url: &str) -> Vec<crate::models::SearchHit> {
    parse_search(&scraper::Html::parse_document(html), page_url)
}

/// Parse raw HTML into a company record
pub fn parse_detail_html(
    html: &str,
    url: &str,
) -> Result<crate::models::CompanyRecord, crate::utils::error::ParseError> {
    parse_detail(&scraper::Html::parse_document(html), url)
}
