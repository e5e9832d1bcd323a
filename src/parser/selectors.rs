//! CSS selectors and per-field extraction rules for masothue.com pages
//!
//! Each detail field owns an ordered list of [`Strategy`] values. The
//! first strategy that finds a non-empty value wins, so adding a fallback
//! for a changed layout is an edit to these tables only.

use lazy_static::lazy_static;
use scraper::Selector;

use crate::parser::strategy::Strategy;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Fields of a company record that are extracted as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TaxId,
    Name,
    TaxAddress,
    Address,
    Status,
    Representative,
    Phone,
    ActivityStartDate,
    ManagingAuthority,
    EntityType,
    PrimaryBusiness,
}

/// Ordered strategies for one field
#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    pub strategies: Vec<Strategy>,
}

lazy_static! {
    // Detail page structure
    pub static ref TAXINFO_TABLE: Selector = parse_selector!("table.table-taxinfo");
    pub static ref TAXINFO_ROWS: Selector = parse_selector!("table.table-taxinfo tr");
    pub static ref ANY_ROWS: Selector = parse_selector!("tr");
    pub static ref CELLS: Selector = parse_selector!("td, th");
    pub static ref LABEL_CONTAINERS: Selector = parse_selector!("p, li, dd, span");

    // Industry table
    pub static ref TABLES: Selector = parse_selector!("table");
    pub static ref THEAD: Selector = parse_selector!("thead");
    pub static ref BODY_ROWS: Selector = parse_selector!("tbody tr");
    pub static ref STRONG: Selector = parse_selector!("strong");

    // Search result listing
    pub static ref LISTING_ITEMS: Selector = parse_selector!(".tax-listing > div");
    pub static ref HEADING_LINK: Selector = parse_selector!("h3 a");
    pub static ref CHILD_DIVS: Selector = parse_selector!("div");
    pub static ref LINK: Selector = parse_selector!("a");
    pub static ref EMPHASIS: Selector = parse_selector!("em");
    pub static ref ADDRESS: Selector = parse_selector!("address");

    static ref NAME_COPY: Selector = parse_selector!("table.table-taxinfo thead th span.copy");
    static ref NAME_ITEMPROP: Selector = parse_selector!("table.table-taxinfo th[itemprop='name']");
    static ref NAME_HEADING: Selector = parse_selector!("h1");
    static ref TAX_ID_ITEMPROP: Selector = parse_selector!("table.table-taxinfo td[itemprop='taxID']");
    static ref TAX_ADDRESS_ID: Selector = parse_selector!("#tax-address-html");
    static ref TAX_ADDRESS_ITEMPROP: Selector = parse_selector!("table.table-taxinfo td[itemprop='address']");
    static ref REPRESENTATIVE_ALUMNI: Selector = parse_selector!("table.table-taxinfo tr[itemprop='alumni'] span[itemprop='name']");
    static ref REPRESENTATIVE_ITEMPROP: Selector = parse_selector!("table.table-taxinfo td span[itemprop='name']");
    static ref PHONE_ITEMPROP: Selector = parse_selector!("table.table-taxinfo td[itemprop='telephone']");

    /// Extraction rules for detail pages, semantic hooks first
    pub static ref DETAIL_RULES: Vec<FieldRule> = vec![
        FieldRule {
            field: Field::TaxId,
            strategies: vec![
                Strategy::Css(&TAX_ID_ITEMPROP),
                Strategy::TableRow("Mã số thuế"),
                Strategy::Label("Mã số thuế"),
                Strategy::Label("MST"),
            ],
        },
        FieldRule {
            field: Field::Name,
            strategies: vec![
                Strategy::Css(&NAME_COPY),
                Strategy::Css(&NAME_ITEMPROP),
                Strategy::Label("Tên công ty"),
                Strategy::Label("Tên doanh nghiệp"),
                // Kept last: detail parsing treats the others as proof of a company page
                Strategy::Css(&NAME_HEADING),
            ],
        },
        FieldRule {
            field: Field::TaxAddress,
            strategies: vec![
                Strategy::Css(&TAX_ADDRESS_ID),
                Strategy::Css(&TAX_ADDRESS_ITEMPROP),
                Strategy::TableRow("Địa chỉ Thuế"),
                Strategy::Label("Địa chỉ Thuế"),
            ],
        },
        FieldRule {
            field: Field::Address,
            strategies: vec![Strategy::TableRow("Địa chỉ"), Strategy::Label("Địa chỉ")],
        },
        FieldRule {
            field: Field::Status,
            strategies: vec![Strategy::TableRow("Tình trạng"), Strategy::Label("Tình trạng")],
        },
        FieldRule {
            field: Field::Representative,
            strategies: vec![
                Strategy::Css(&REPRESENTATIVE_ALUMNI),
                Strategy::Css(&REPRESENTATIVE_ITEMPROP),
                Strategy::TableRow("Người đại diện"),
                Strategy::Label("Người đại diện"),
            ],
        },
        FieldRule {
            field: Field::Phone,
            strategies: vec![
                Strategy::Css(&PHONE_ITEMPROP),
                Strategy::TableRow("Điện thoại"),
                Strategy::Label("Điện thoại"),
            ],
        },
        FieldRule {
            field: Field::ActivityStartDate,
            strategies: vec![
                Strategy::TableRow("Ngày hoạt động"),
                Strategy::Label("Ngày hoạt động"),
            ],
        },
        FieldRule {
            field: Field::ManagingAuthority,
            strategies: vec![Strategy::TableRow("Quản lý bởi"), Strategy::Label("Quản lý bởi")],
        },
        FieldRule {
            field: Field::EntityType,
            strategies: vec![
                Strategy::TableRow("Loại hình DN"),
                Strategy::Label("Loại hình DN"),
                Strategy::Label("Loại hình doanh nghiệp"),
            ],
        },
        FieldRule {
            field: Field::PrimaryBusiness,
            strategies: vec![
                Strategy::TableRow("Ngành nghề chính"),
                Strategy::Label("Ngành nghề chính"),
            ],
        },
    ];
}

/// Rules for one field
pub fn rule_for(field: Field) -> &'static [Strategy] {
    DETAIL_RULES
        .iter()
        .find(|rule| rule.field == field)
        .map(|rule| rule.strategies.as_slice())
        .unwrap_or(&[])
}
