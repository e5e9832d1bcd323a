//! Human-readable rendering of records and search hits
//!
//! Labels follow the active locale (see [`crate::i18n`]). Fields that were
//! not found are left out; fields the site shows as blank or hidden are
//! printed with a placeholder.

use std::fmt::Write;

use crate::i18n::t;
use crate::models::{CompanyRecord, CompanyStatus, SearchHit};

fn status_label(status: CompanyStatus) -> String {
    match status {
        CompanyStatus::Active => t!("format.status_active").to_string(),
        CompanyStatus::Inactive => t!("format.status_inactive").to_string(),
        CompanyStatus::Unknown => t!("format.status_unknown").to_string(),
    }
}

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    let shown = if value.is_empty() {
        t!("format.hidden").to_string()
    } else {
        value.to_string()
    };
    let _ = writeln!(out, "{label}: {shown}");
}

/// Render a full record, one "label: value" line per field
pub fn format_company_details(record: &CompanyRecord) -> String {
    let mut out = String::new();

    push_field(&mut out, &t!("format.name"), record.name.as_deref());
    push_field(
        &mut out,
        &t!("format.tax_id"),
        record.tax_id.as_ref().map(|id| id.as_str()),
    );
    push_field(&mut out, &t!("format.tax_address"), record.tax_address.as_deref());
    push_field(&mut out, &t!("format.address"), record.address.as_deref());
    push_field(&mut out, &t!("format.representative"), record.representative.as_deref());
    push_field(&mut out, &t!("format.phone"), record.phone.as_deref());

    let status = match &record.status_text {
        Some(text) if !text.is_empty() => text.clone(),
        _ => status_label(record.status),
    };
    push_field(&mut out, &t!("format.status"), Some(&status));

    let date = record
        .activity_start_date
        .map(|d| d.format("%d/%m/%Y").to_string());
    push_field(&mut out, &t!("format.activity_start_date"), date.as_deref());
    push_field(
        &mut out,
        &t!("format.managing_authority"),
        record.managing_authority.as_deref(),
    );
    push_field(&mut out, &t!("format.entity_type"), record.entity_type.as_deref());
    push_field(
        &mut out,
        &t!("format.primary_business"),
        record.primary_business.as_deref(),
    );

    if let Some(lines) = record.other_business_lines.as_ref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "{}:", t!("format.other_business_lines"));
        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "  - {line}");
        }
    }

    push_field(&mut out, &t!("format.detail_reference"), record.detail_reference.as_deref());

    if record.is_partial() {
        let _ = writeln!(
            out,
            "{}",
            t!("format.partial", fields = record.missing_fields().join(", "))
        );
    }

    out
}

/// Render a numbered list of search hits
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("{}\n", t!("format.no_results", query = query));
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let name = hit.name.as_deref().unwrap_or("-");
        let id = hit.tax_id.as_ref().map(|t| t.as_str()).unwrap_or("-");
        let _ = writeln!(out, "{:>3}. {name} [{id}]", i + 1);

        if let Some(rep) = hit.representative.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "     {}: {rep}", t!("format.representative"));
        }
        if let Some(addr) = hit.address.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "     {}: {addr}", t!("format.address"));
        }
        if let Some(link) = hit.reference.as_deref() {
            let _ = writeln!(out, "     {link}");
        }
    }
    out
}
