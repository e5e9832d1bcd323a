//! Search result page extraction

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

use crate::models::{CompanyRecord, SearchHit};
use crate::parser::detail::{find_tax_id, parse_detail};
use crate::parser::sanitize::{clean_representative, strip_label};
use crate::parser::selectors::{
    ADDRESS, CHILD_DIVS, EMPHASIS, HEADING_LINK, LINK, LISTING_ITEMS, TAXINFO_TABLE,
};
use crate::parser::strategy::{element_text, extract_first, Strategy};

const TAX_ID_LABEL: &str = "Mã số thuế";
const REPRESENTATIVE_LABEL: &str = "Người đại diện";

/// What a search request returned
#[derive(Debug, Clone)]
pub enum SearchPage {
    /// A result listing
    Results(Vec<SearchHit>),
    /// The site redirected straight to one company page
    Company(CompanyRecord),
}

impl SearchPage {
    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            Self::Results(hits) => hits,
            Self::Company(record) => {
                let hit = SearchHit {
                    tax_id: record.tax_id,
                    name: record.name,
                    reference: record.detail_reference,
                    representative: record.representative,
                    address: record.tax_address.or(record.address),
                };
                if is_usable(&hit) {
                    vec![hit]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Parse a search response, telling listings and company pages apart
///
/// An exact tax identifier search is redirected by the site straight to the
/// company page.
pub fn parse_search_page(document: &Html, page_url: &str) -> SearchPage {
    if document.select(&TAXINFO_TABLE).next().is_some() {
        if let Ok(record) = parse_detail(document, page_url) {
            return SearchPage::Company(record);
        }
    }

    let base = Url::parse(page_url).ok();

    let hits: Vec<SearchHit> = document
        .select(&LISTING_ITEMS)
        .map(|item| item_hit(item, base.as_ref()))
        .filter(is_usable)
        .collect();

    if hits.is_empty() {
        SearchPage::Results(heading_fallback(document, base.as_ref()))
    } else {
        SearchPage::Results(hits)
    }
}

/// Parse a search result page into hits, in document order
pub fn parse_search(document: &Html, page_url: &str) -> Vec<SearchHit> {
    parse_search_page(document, page_url).into_hits()
}

fn is_usable(hit: &SearchHit) -> bool {
    hit.name.is_some() || hit.tax_id.is_some()
}

/// One result block: heading link, labelled lines, address
fn item_hit(item: ElementRef<'_>, base: Option<&Url>) -> SearchHit {
    let link = item.select(&HEADING_LINK).next();
    let mut hit = link.map(|a| link_hit(a, base)).unwrap_or_default();

    if let Some((line, value)) = labelled_div(item, TAX_ID_LABEL) {
        let from_link = line.select(&LINK).next().map(element_text);
        if let Some(id) = from_link.as_deref().and_then(find_tax_id).or_else(|| find_tax_id(&value)) {
            hit.tax_id = Some(id);
        }
    }

    if let Some((line, value)) = labelled_div(item, REPRESENTATIVE_LABEL) {
        let name = line
            .select(&EMPHASIS)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty())
            .unwrap_or(value);
        hit.representative = clean_representative(&name);
    }

    hit.address = item
        .select(&ADDRESS)
        .next()
        .map(element_text)
        .or_else(|| extract_first(item, &[Strategy::Label("Địa chỉ")]));

    hit
}

/// Name, reference and tax id from a detail link
fn link_hit(link: ElementRef<'_>, base: Option<&Url>) -> SearchHit {
    let name = Some(element_text(link)).filter(|s| !s.is_empty());
    let reference = link.value().attr("href").map(|href| resolve(href, base));
    let tax_id = reference.as_deref().and_then(find_tax_id);

    SearchHit {
        tax_id,
        name,
        reference,
        ..Default::default()
    }
}

/// Innermost `div` whose text is "label: value"
fn labelled_div<'a>(scope: ElementRef<'a>, label: &str) -> Option<(ElementRef<'a>, String)> {
    scope
        .select(&CHILD_DIVS)
        .filter_map(|div| strip_label(&element_text(div), label).map(|v| (div, v)))
        .last()
}

/// Layout-independent fallback: every heading link is a candidate
fn heading_fallback(document: &Html, base: Option<&Url>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for link in document.select(&HEADING_LINK) {
        let container = link
            .parent()
            .and_then(|h3| h3.parent())
            .and_then(ElementRef::wrap);

        let hit = match container {
            Some(block) if block.select(&HEADING_LINK).count() == 1 => item_hit(block, base),
            _ => link_hit(link, base),
        };

        if !is_usable(&hit) {
            continue;
        }
        let key = hit
            .reference
            .clone()
            .or_else(|| hit.tax_id.as_ref().map(|id| id.to_string()));
        if let Some(key) = key {
            if !seen.insert(key) {
                continue;
            }
        }
        hits.push(hit);
    }

    hits
}

fn resolve(href: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}
