//! Internationalization (i18n) support
//!
//! User-facing error descriptions and formatted output are available in
//! Vietnamese (vi) and English (en).
//!
//! # Environment Variables
//!
//! - `MASOTHUE_LANG`: Set the preferred language (vi, en). Defaults to English.
//!
//! # Usage
//!
//! ```rust,ignore
//! use masothue::i18n::{t, set_locale};
//!
//! set_locale("vi");
//! let msg = t!("errors.kind.captcha");
//! ```

// Note: rust_i18n::i18n! macro is declared in lib.rs (crate root)

/// Set the current locale for translations
///
/// # Examples
///
/// ```rust,ignore
/// use masothue::i18n::set_locale;
///
/// set_locale("vi-VN");
/// ```
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(normalize_locale(locale));
}

/// Get the current locale
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// Initialize i18n from environment variables
///
/// Reads `MASOTHUE_LANG`. Falls back to English if not set or unknown.
pub fn init_from_env() {
    let locale = std::env::var("MASOTHUE_LANG").unwrap_or_else(|_| "en".to_string());
    set_locale(&locale);
}

/// Normalize locale code to supported format
///
/// - vi-VN, vi_VN, vietnamese, tiếng việt -> vi
/// - anything else -> en
fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_lowercase();

    if lower.starts_with("vi") || lower == "tiếng việt" {
        "vi"
    } else {
        "en"
    }
}

/// Translate a key with optional parameters
///
/// This is a re-export of rust_i18n::t! for convenience.
///
/// # Examples
///
/// ```rust,ignore
/// use masothue::i18n::t;
///
/// let msg = t!("format.no_results", query = "abc");
/// ```
#[doc(inline)]
pub use rust_i18n::t;
