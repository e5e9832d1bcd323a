// Core data structures for the masothue client

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Minimum number of digits in a tax identifier
pub const MIN_TAX_ID_LEN: usize = 8;

/// Maximum number of digits in a tax identifier
pub const MAX_TAX_ID_LEN: usize = 15;

/// Maximum length of a normalized query, in characters
pub const MAX_QUERY_LENGTH: usize = 200;

/// Normalized tax identifier (MST): 8 to 15 ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    /// Normalize a raw identifier
    ///
    /// Whitespace, `-` and `.` separators are removed; the remainder must be
    /// 8 to 15 ASCII digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
            .collect();

        if digits.is_empty() {
            return Err(Error::validation("tax identifier is empty"));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::validation(format!(
                "tax identifier contains non-digit characters: {raw}"
            )));
        }
        if !(MIN_TAX_ID_LEN..=MAX_TAX_ID_LEN).contains(&digits.len()) {
            return Err(Error::validation(format!(
                "tax identifier must have {MIN_TAX_ID_LEN}-{MAX_TAX_ID_LEN} digits, got {}",
                digits.len()
            )));
        }

        Ok(Self(digits))
    }

    /// Lenient variant used on scraped text; returns `None` instead of an error
    pub fn find(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaxId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TaxId> for String {
    fn from(id: TaxId) -> Self {
        id.0
    }
}

/// A normalized lookup query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Query {
    /// Query that looks like a tax identifier
    TaxId(TaxId),
    /// Free-text company name query
    Name(String),
}

impl Query {
    /// Normalize raw user input
    ///
    /// Trims and collapses whitespace. Input made only of digits and
    /// separators is treated as a tax identifier and must be valid.
    pub fn parse(raw: &str) -> Result<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            return Err(Error::validation("query is empty"));
        }
        if collapsed.chars().count() > MAX_QUERY_LENGTH {
            return Err(Error::validation(format!(
                "query exceeds {MAX_QUERY_LENGTH} characters"
            )));
        }

        let looks_numeric = collapsed
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-' || c == '.')
            && collapsed.chars().any(|c| c.is_ascii_digit());

        if looks_numeric {
            return TaxId::parse(&collapsed).map(Self::TaxId);
        }

        Ok(Self::Name(collapsed))
    }

    /// Text sent to the search endpoint
    pub fn as_str(&self) -> &str {
        match self {
            Self::TaxId(id) => id.as_str(),
            Self::Name(name) => name,
        }
    }

    pub fn tax_id(&self) -> Option<&TaxId> {
        match self {
            Self::TaxId(id) => Some(id),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate match from a search result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchHit {
    pub tax_id: Option<TaxId>,
    pub name: Option<String>,
    /// Absolute URL of the detail page
    pub reference: Option<String>,
    pub representative: Option<String>,
    pub address: Option<String>,
}

impl SearchHit {
    /// Whether this hit's tax identifier equals `id`
    pub fn matches(&self, id: &TaxId) -> bool {
        self.tax_id.as_ref() == Some(id)
    }
}

/// Operating status of a registered entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl CompanyStatus {
    /// Classify the status text shown on a company page
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();

        const INACTIVE_MARKERS: &[&str] = &[
            "ngừng",
            "giải thể",
            "đóng mã số thuế",
            "đóng mst",
            "không hoạt động",
            "bỏ địa chỉ",
        ];

        if INACTIVE_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::Inactive
        } else if lower.contains("đang hoạt động") {
            Self::Active
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
        }
    }
}

/// Full registry record for one entity
///
/// Every field is optional: `None` means the field was not found in the
/// source document, `Some("")` means the page shows the field but its value
/// is blank or hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompanyRecord {
    pub tax_id: Option<TaxId>,
    pub name: Option<String>,
    pub tax_address: Option<String>,
    pub address: Option<String>,
    pub representative: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub status: CompanyStatus,
    /// Status text as displayed by the site
    pub status_text: Option<String>,
    pub activity_start_date: Option<NaiveDate>,
    pub managing_authority: Option<String>,
    pub entity_type: Option<String>,
    pub primary_business: Option<String>,
    pub other_business_lines: Option<Vec<String>>,
    pub detail_reference: Option<String>,
}

impl CompanyRecord {
    /// Build a low-confidence record from a search hit
    pub fn from_hit(hit: &SearchHit) -> Self {
        Self {
            tax_id: hit.tax_id.clone(),
            name: hit.name.clone(),
            address: hit.address.clone(),
            representative: hit.representative.clone(),
            detail_reference: hit.reference.clone(),
            ..Default::default()
        }
    }

    /// Names of the fields that were not found in the source document
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let checks: [(&'static str, bool); 12] = [
            ("tax_id", self.tax_id.is_none()),
            ("name", self.name.is_none()),
            ("tax_address", self.tax_address.is_none()),
            ("address", self.address.is_none()),
            ("representative", self.representative.is_none()),
            ("phone", self.phone.is_none()),
            ("status", self.status_text.is_none()),
            ("activity_start_date", self.activity_start_date.is_none()),
            ("managing_authority", self.managing_authority.is_none()),
            ("entity_type", self.entity_type.is_none()),
            ("primary_business", self.primary_business.is_none()),
            ("other_business_lines", self.other_business_lines.is_none()),
        ];
        for (field, absent) in checks {
            if absent {
                missing.push(field);
            }
        }
        missing
    }

    /// A record missing its identifier or name is low confidence
    pub fn is_partial(&self) -> bool {
        self.tax_id.is_none() || self.name.is_none()
    }
}

/// Parse the activity start date formats used by the site
pub fn parse_activity_date(text: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
