//! Place normalization: casing, US state handling, country inference.

use crate::gazetteer::Gazetteer;
use crate::rules::{COUNTRY_COLLAPSE, US_STATE_ABBREVS, US_STATE_FULL_TO_ABBR};

/// A normalized place and whether its country came from the gazetteer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlace {
    pub place: String,
    pub country_inferred: bool,
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
fn title_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Title-case places written entirely in capitals; leave mixed case alone.
pub fn fix_shouting(place: &str) -> String {
    let p = place.trim();
    let mut letters = p.chars().filter(|c| c.is_alphabetic()).peekable();
    if letters.peek().is_some() && letters.all(|c| !c.is_lowercase()) {
        title_words(p)
    } else {
        p.to_string()
    }
}

/// Canonicalize US places to `City, ST, USA`.
pub fn normalize_us_place(place: &str) -> String {
    let p = place.trim();
    let parts: Vec<&str> = p.split(',').map(str::trim).collect();
    let n = parts.len();

    if n >= 2 && parts[n - 1].to_lowercase().starts_with("united states") {
        let mut fixed = parts.clone();
        fixed[n - 1] = "USA";
        return fixed.join(", ");
    }

    if n >= 2 {
        let last = parts[n - 1].to_lowercase();
        if let Some(abbr) = US_STATE_FULL_TO_ABBR.get(last.as_str()) {
            return format!("{}, {abbr}, USA", parts[..n - 1].join(", "));
        }
        let two_last = format!("{} {}", parts[n - 2], parts[n - 1]).to_lowercase();
        if n >= 3
            && let Some(abbr) = US_STATE_FULL_TO_ABBR.get(two_last.as_str())
        {
            return format!("{}, {abbr}, USA", parts[..n - 2].join(", "));
        }
    }

    if n == 2 {
        let state = parts[1].to_uppercase();
        if US_STATE_ABBREVS.contains(state.as_str()) {
            return format!("{}, {state}, USA", parts[0]);
        }
    }

    if n >= 3 && US_STATE_ABBREVS.contains(parts[n - 2].to_uppercase().as_str()) {
        let mut fixed = parts.clone();
        fixed[n - 1] = "USA";
        return fixed.join(", ");
    }

    p.to_string()
}

/// Append the country code to a bare city name when the gazetteer knows
/// exactly one country for it.
pub fn add_country_from_city(place: &str, gazetteer: &Gazetteer) -> (String, bool) {
    let parts: Vec<&str> = place
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if let [city] = parts.as_slice()
        && let Some(code) = gazetteer.unique_country(city)
    {
        return (format!("{city}, {code}"), true);
    }
    (place.to_string(), false)
}

/// Replace long official country names with their short form.
pub fn collapse_country_names(place: &str) -> String {
    COUNTRY_COLLAPSE
        .iter()
        .fold(place.to_string(), |acc, &(long, short)| acc.replace(long, short))
}

/// Full place pipeline: `;` separators become commas, then casing, US
/// handling, country inference and country-name collapsing. Empty input
/// stays empty.
pub fn normalize_place(place: &str, gazetteer: &Gazetteer) -> NormalizedPlace {
    let p = place.trim();
    if p.is_empty() {
        return NormalizedPlace {
            place: String::new(),
            country_inferred: false,
        };
    }
    let p = normalize_us_place(&fix_shouting(&p.replace(';', ",")));
    let (p, country_inferred) = add_country_from_city(&p, gazetteer);
    NormalizedPlace {
        place: collapse_country_names(&p),
        country_inferred,
    }
}
