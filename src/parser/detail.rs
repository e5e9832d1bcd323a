//! Company detail page extraction

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::models::{parse_activity_date, CompanyRecord, CompanyStatus, TaxId};
use crate::parser::sanitize::{
    clean_phone, clean_representative, is_hidden_value, normalize_label, strip_tax_id_prefix,
};
use crate::parser::selectors::{
    rule_for, Field, BODY_ROWS, CELLS, STRONG, TABLES, TAXINFO_TABLE, THEAD,
};
use crate::parser::strategy::{element_text, extract_first};
use crate::utils::error::ParseError;

lazy_static! {
    static ref TAX_ID_IN_TEXT: Regex =
        Regex::new(r"\b\d{8,15}(?:-\d{3})?\b").expect("Invalid regex pattern");
}

/// Parse a company detail page
///
/// Each field falls back independently, so a markup change degrades single
/// fields to absent. The page is rejected only when it carries none of the
/// info table, a tax identifier or a labelled company name. The page heading
/// alone does not count, since every page on the site has one.
///
/// # Errors
///
/// Returns `ParseError::UnrecognizedPage` when the document is not a
/// company page at all
pub fn parse_detail(document: &Html, url: &str) -> Result<CompanyRecord, ParseError> {
    let root = document.root_element();
    let has_info_table = document.select(&TAXINFO_TABLE).next().is_some();

    let text = |field: Field| extract_first(root, rule_for(field));

    let tax_id = text(Field::TaxId).and_then(|t| find_tax_id(&t));

    let name_rule = rule_for(Field::Name);
    let labelled_name = name_rule
        .split_last()
        .and_then(|(_heading, named)| extract_first(root, named))
        .filter(|name| !name.is_empty());

    if !has_info_table && tax_id.is_none() && labelled_name.is_none() {
        return Err(ParseError::UnrecognizedPage {
            url: url.to_string(),
        });
    }

    let status_text = text(Field::Status);
    let status = status_text
        .as_deref()
        .map(CompanyStatus::from_text)
        .unwrap_or_default();

    let activity_start_date = text(Field::ActivityStartDate).and_then(|t| {
        let date = parse_activity_date(&t);
        if date.is_none() && !t.is_empty() {
            debug!(value = %t, "Unrecognized activity date format");
        }
        date
    });

    let phone = text(Field::Phone).map(|p| {
        if is_hidden_value(&p) {
            String::new()
        } else {
            clean_phone(&p)
        }
    });

    let representative = text(Field::Representative).and_then(|r| {
        if r.is_empty() {
            return Some(r);
        }
        let name = clean_representative(&r);
        if name.is_none() {
            debug!(value = %r, "Discarded representative value");
        }
        name
    });

    let industries = industry_table(root);
    let primary_business = text(Field::PrimaryBusiness)
        .or_else(|| industries.as_ref().and_then(|t| t.primary.clone()));

    let record = CompanyRecord {
        tax_id,
        name: labelled_name
            .or_else(|| text(Field::Name))
            .map(|n| strip_tax_id_prefix(&n)),
        tax_address: text(Field::TaxAddress),
        address: text(Field::Address),
        representative,
        phone,
        status,
        status_text,
        activity_start_date,
        managing_authority: text(Field::ManagingAuthority),
        entity_type: text(Field::EntityType),
        primary_business,
        other_business_lines: industries.map(|t| t.lines),
        detail_reference: Some(url.to_string()),
    };

    if record.is_partial() {
        warn!(
            url = %url,
            missing = ?record.missing_fields(),
            "Detail page parsed with missing key fields"
        );
    }

    Ok(record)
}

/// First tax identifier pattern found in a text
pub(crate) fn find_tax_id(text: &str) -> Option<TaxId> {
    TAX_ID_IN_TEXT
        .find(text)
        .and_then(|m| TaxId::find(m.as_str()))
}

struct IndustryTable {
    lines: Vec<String>,
    primary: Option<String>,
}

/// The business lines table has a header with "Mã" and "Ngành" columns
fn industry_table(root: ElementRef<'_>) -> Option<IndustryTable> {
    let table = root.select(&TABLES).find(|table| {
        if table.value().classes().any(|c| c == "table-taxinfo") {
            return false;
        }
        let Some(head) = table.select(&THEAD).next() else {
            return false;
        };
        let header = normalize_label(&element_text(head));
        header.contains("mã") && header.contains("ngành")
    })?;

    let mut lines = Vec::new();
    let mut primary = None;

    for row in table.select(&BODY_ROWS) {
        let cells: Vec<_> = row.select(&CELLS).collect();
        let [code, name, ..] = cells.as_slice() else {
            continue;
        };

        let code = element_text(*code);
        let name_text = element_text(*name);
        if name_text.is_empty() {
            continue;
        }

        if primary.is_none() && name.select(&STRONG).next().is_some() {
            primary = Some(name_text.clone());
        }

        lines.push(if code.is_empty() {
            name_text
        } else {
            format!("{code} - {name_text}")
        });
    }

    Some(IndustryTable { lines, primary })
}
