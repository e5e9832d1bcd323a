//! Anti-bot challenge detection
//!
//! Only structural markers count: widget class/id names, challenge script
//! and iframe sources, and widget data attributes. Plain text mentioning
//! "captcha" is never enough.

use lazy_static::lazy_static;
use scraper::{Html, Selector};

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref WIDGET_CONTAINERS: Vec<(&'static str, Selector)> = vec![
        ("geetest", parse_selector!("[class*='geetest'], [id*='geetest']")),
        ("g-recaptcha", parse_selector!(".g-recaptcha, #g-recaptcha")),
        ("h-captcha", parse_selector!(".h-captcha, #h-captcha")),
        ("captcha-container", parse_selector!(
            ".captcha-container, #captcha-container, .captcha-box, #captcha-box, \
             .captcha-wrapper, #captcha-wrapper, .captcha-widget, #captcha-widget"
        )),
        ("gt_holder", parse_selector!(".gt_holder, #gt_holder, .gt_box, #gt_box")),
    ];

    static ref SCRIPTS: Selector = parse_selector!("script[src]");
    static ref IFRAMES: Selector = parse_selector!("iframe[src]");
    static ref WIDGET_ATTRS: Selector = parse_selector!("[data-sitekey], [data-widget-id]");
}

const SCRIPT_MARKERS: &[&str] = &["geetest", "recaptcha", "hcaptcha", "captcha.js", "gt.js"];
const IFRAME_MARKERS: &[&str] = &["recaptcha", "hcaptcha", "geetest"];

/// Which marker identified the challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaMarker(pub String);

impl std::fmt::Display for CaptchaMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Look for a challenge widget in a parsed document
pub fn detect_captcha(document: &Html) -> Option<CaptchaMarker> {
    for (name, selector) in WIDGET_CONTAINERS.iter() {
        if document.select(selector).next().is_some() {
            return Some(CaptchaMarker(format!("widget:{name}")));
        }
    }

    for script in document.select(&SCRIPTS) {
        let src = script.value().attr("src").unwrap_or_default().to_lowercase();
        if let Some(hit) = SCRIPT_MARKERS.iter().find(|m| script_matches(&src, m)) {
            return Some(CaptchaMarker(format!("script:{hit}")));
        }
    }

    for iframe in document.select(&IFRAMES) {
        let src = iframe.value().attr("src").unwrap_or_default().to_lowercase();
        if let Some(hit) = IFRAME_MARKERS.iter().find(|m| src.contains(*m)) {
            return Some(CaptchaMarker(format!("iframe:{hit}")));
        }
    }

    if let Some(el) = document.select(&WIDGET_ATTRS).next() {
        let attr = if el.value().attr("data-sitekey").is_some() {
            "data-sitekey"
        } else {
            "data-widget-id"
        };
        return Some(CaptchaMarker(format!("attr:{attr}")));
    }

    None
}

/// `gt.js` must be the file name, not a suffix of e.g. `widget.js`
fn script_matches(src: &str, marker: &str) -> bool {
    if marker == "gt.js" {
        let file = src.split(['?', '#']).next().unwrap_or_default();
        return file.rsplit('/').next() == Some("gt.js");
    }
    src.contains(marker)
}
