//! Cheap pre-filter deciding whether a raw listing is worth an extraction call.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest admissible listing, in characters after trimming.
pub const MIN_LEN: usize = 10;
/// Longest admissible listing, in characters after trimming.
pub const MAX_LEN: usize = 400;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static MANY_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{6,}").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)[0-9]{2}\b").unwrap());
static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec|january|february|march|april|june|july|august|september|october|november|december)\b",
    )
    .unwrap()
});

/// True when the text carries a 19xx/20xx year or a month name.
pub fn has_date_signal(text: &str) -> bool {
    YEAR_RE.is_match(text) || MONTH_RE.is_match(text)
}

/// Decide whether `raw` should be sent to the extractor.
///
/// Rejects missing values, text shorter than [`MIN_LEN`] or longer than
/// [`MAX_LEN`] characters, embedded markup, runs of six or more digits, and
/// text with no date signal at all.
pub fn admit(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    let text = raw.trim();
    let len = text.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return false;
    }
    if HTML_TAG_RE.is_match(text) || MANY_DIGITS_RE.is_match(text) {
        return false;
    }
    has_date_signal(text)
}
