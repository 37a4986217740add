//! Edition number ("12th", "Second", "XXV") of a conference.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::{ORDINAL_WORDS, roman_value};

/// Largest roman numeral accepted as an edition number.
const MAX_ROMAN: u32 = 1000;

/// Extract the edition number from a conference name.
///
/// Rules are tried in order and the first hit wins: a numeric ordinal
/// (`12th`, `3'rd`), a spelled-out ordinal (`Second`, `Twenty-First`), then a
/// canonical uppercase roman numeral in `1..=1000`.
pub fn extract_order(name: &str) -> Option<u32> {
    static NUMERIC_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\b([0-9]+)['’]?(?:st|nd|rd|th)\b").unwrap());
    static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z\-]+").unwrap());
    static ROMAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[IVXLCDM]+\b").unwrap());

    if name.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_RE.captures(name)
        && let Ok(n) = caps[1].parse::<u32>()
    {
        return Some(n);
    }

    if let Some(n) = WORD_RE
        .find_iter(name)
        .find_map(|m| ORDINAL_WORDS.get(m.as_str().to_lowercase().as_str()).copied())
    {
        return Some(n);
    }

    ROMAN_RE
        .find_iter(name)
        .find_map(|m| roman_to_int(m.as_str()))
}

/// Decode a roman numeral with subtractive rules. Only canonical spellings in
/// `1..=1000` are accepted, so acronyms such as `ICDM` or `MIX` are rejected.
pub fn roman_to_int(s: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut prev = 0u32;
    for c in s.chars().rev() {
        let v = roman_value(c)?;
        if v < prev {
            total = total.checked_sub(v)?;
        } else {
            total += v;
            prev = v;
        }
    }
    if !(1..=MAX_ROMAN).contains(&total) || int_to_roman(total) != s {
        return None;
    }
    Some(total)
}

fn int_to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for &(value, symbol) in &TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}
