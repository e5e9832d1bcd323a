//! Text cleanup for values scraped from masothue.com pages

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").expect("Invalid regex pattern");

    /// "0100109106 - CÔNG TY ..." prefix used in page headings
    static ref TAX_ID_PREFIX_REGEX: Regex =
        Regex::new(r"^\d{8,15}(?:-\d{3})?\s*[-–]\s*").expect("Invalid regex pattern");
}

/// Markers after which a representative cell lists other companies
const REPRESENTATIVE_CUTOFFS: &[&str] = &["Ngoài ra", "còn đại diện", "("];

/// Text that means a label or identifier was captured instead of a person
const NOT_A_PERSON: &[&str] = &["Mã số thuế", "MST", "Tax", "Code", "Địa chỉ", "Address"];

/// Remove zero-width spaces and similar invisible characters
///
/// # Examples
///
/// ```
/// use masothue::parser::sanitize::remove_zero_width;
///
/// assert_eq!(remove_zero_width("Công\u{200B}ty\u{FEFF}"), "Côngty");
/// ```
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{FEFF}'))
        .collect()
}

/// Strip invisible characters, turn NBSP into spaces, collapse whitespace
pub fn clean_text(text: &str) -> String {
    let visible = remove_zero_width(text).replace('\u{00A0}', " ");
    WHITESPACE_REGEX.replace_all(visible.trim(), " ").into_owned()
}

/// Canonical form of a field label for comparison
pub fn normalize_label(text: &str) -> String {
    clean_text(text)
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

/// If `text` starts with `label` followed by a colon, return the remainder
///
/// ```
/// use masothue::parser::sanitize::strip_label;
///
/// assert_eq!(strip_label("Mã số thuế: 3604062974", "Mã số thuế"), Some("3604062974".to_string()));
/// assert_eq!(strip_label("Địa chỉ Thuế: X", "Địa chỉ"), None);
/// ```
pub fn strip_label(text: &str, label: &str) -> Option<String> {
    let text = clean_text(text);
    let label = clean_text(label);

    let head = text.get(..label.len())?;
    if head.to_lowercase() != label.to_lowercase() {
        return None;
    }

    let rest = text[label.len()..].trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim().to_string())
}

/// Drop a leading "tax id - " prefix from a company heading
pub fn strip_tax_id_prefix(name: &str) -> String {
    TAX_ID_PREFIX_REGEX.replace(name, "").trim().to_string()
}

/// Whether a phone cell shows the "hidden by owner" notice
pub fn is_hidden_value(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("bị ẩn") || lower.contains("ẩn theo yêu cầu")
}

/// Reduce a representative cell to the person's name
///
/// Cells often continue with the other companies the person represents or a
/// parenthesised role. Returns `None` when what remains does not look like a
/// name.
///
/// ```
/// use masothue::parser::sanitize::clean_representative;
///
/// assert_eq!(
///     clean_representative("NGUYỄN VĂN A Ngoài ra NGUYỄN VĂN A còn đại diện các doanh nghiệp: X"),
///     Some("NGUYỄN VĂN A".to_string())
/// );
/// assert_eq!(clean_representative("Mã số thuế: 3604062974"), None);
/// ```
pub fn clean_representative(text: &str) -> Option<String> {
    let text = clean_text(text);
    let cut = REPRESENTATIVE_CUTOFFS
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len());

    let name = text[..cut].trim_matches(|c: char| c.is_whitespace() || ".,;:".contains(c));
    is_person_name(name).then(|| name.to_string())
}

fn is_person_name(text: &str) -> bool {
    let len = text.chars().count();
    if !(2..=100).contains(&len) || !text.chars().any(char::is_alphabetic) {
        return false;
    }

    let digits = text.chars().filter(char::is_ascii_digit).count();
    digits * 2 <= len && !NOT_A_PERSON.iter().any(|word| text.contains(word))
}

/// Keep only digits, `+`, `-`, parentheses and single spaces
///
/// An empty result means the cell carried no number.
pub fn clean_phone(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')') || c.is_whitespace())
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }
    WHITESPACE_REGEX.replace_all(kept.trim(), " ").into_owned()
}
