//! Field extraction strategies
//!
//! A [`Strategy`] looks for one value inside a scope element and reports
//! present, blank (`Some("")`) or absent (`None`).

use scraper::{ElementRef, Selector};

use crate::parser::sanitize::{clean_text, normalize_label, strip_label};
use crate::parser::selectors::{ANY_ROWS, CELLS, LABEL_CONTAINERS, TAXINFO_ROWS};

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Text of the first element matching a semantic selector
    Css(&'static Selector),

    /// Value cell of the info-table row whose label cell equals the label
    TableRow(&'static str),

    /// Any table row or "Label: value" text with this label
    Label(&'static str),
}

impl Strategy {
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        match self {
            Self::Css(selector) => scope.select(selector).next().map(element_text),
            Self::TableRow(label) => row_value(scope, &TAXINFO_ROWS, label),
            Self::Label(label) => row_value(scope, &ANY_ROWS, label)
                .or_else(|| labelled_text(scope, label)),
        }
    }
}

/// Try strategies in order
///
/// Returns the first non-empty value. If some strategy matched but every
/// match was blank, returns `Some("")`; if nothing matched, `None`.
pub fn extract_first(scope: ElementRef<'_>, strategies: &[Strategy]) -> Option<String> {
    let mut seen_blank = false;

    for strategy in strategies {
        match strategy.apply(scope) {
            Some(value) if !value.is_empty() => return Some(value),
            Some(_) => seen_blank = true,
            None => {}
        }
    }

    seen_blank.then(String::new)
}

/// Cleaned text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn row_value(scope: ElementRef<'_>, rows: &Selector, label: &str) -> Option<String> {
    let wanted = normalize_label(label);

    scope.select(rows).find_map(|row| {
        let mut cells = row.select(&CELLS);
        let head = cells.next()?;
        if normalize_label(&element_text(head)) != wanted {
            return None;
        }
        Some(cells.next().map(element_text).unwrap_or_default())
    })
}

fn labelled_text(scope: ElementRef<'_>, label: &str) -> Option<String> {
    scope
        .select(&LABEL_CONTAINERS)
        .find_map(|el| strip_label(&element_text(el), label))
}
