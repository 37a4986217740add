//! Static lexical tables shared by the normalizers.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Connector words kept lowercase inside a title segment.
pub static SMALL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "or", "of", "on", "in", "for", "to", "the", "a", "an", "at", "by", "with",
    ]
    .into_iter()
    .collect()
});

/// Words whose canonical casing the generic title-caser would get wrong.
pub static ACRONYM_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| [("eccomas", "ECCOMAS")].into_iter().collect());

/// Two-letter US state and territory codes (plus the dotted `D.C.` form).
pub static US_STATE_ABBREVS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
        "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
        "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
        "VA", "WA", "WV", "WI", "WY", "DC", "D.C.",
    ]
    .into_iter()
    .collect()
});

/// Lowercased full state name → postal code.
pub static US_STATE_FULL_TO_ABBR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("alabama", "AL"),
        ("alaska", "AK"),
        ("arizona", "AZ"),
        ("arkansas", "AR"),
        ("california", "CA"),
        ("colorado", "CO"),
        ("connecticut", "CT"),
        ("delaware", "DE"),
        ("florida", "FL"),
        ("georgia", "GA"),
        ("hawaii", "HI"),
        ("idaho", "ID"),
        ("illinois", "IL"),
        ("indiana", "IN"),
        ("iowa", "IA"),
        ("kansas", "KS"),
        ("kentucky", "KY"),
        ("louisiana", "LA"),
        ("maine", "ME"),
        ("maryland", "MD"),
        ("massachusetts", "MA"),
        ("michigan", "MI"),
        ("minnesota", "MN"),
        ("mississippi", "MS"),
        ("missouri", "MO"),
        ("montana", "MT"),
        ("nebraska", "NE"),
        ("nevada", "NV"),
        ("new hampshire", "NH"),
        ("new jersey", "NJ"),
        ("new mexico", "NM"),
        ("new york", "NY"),
        ("north carolina", "NC"),
        ("north dakota", "ND"),
        ("ohio", "OH"),
        ("oklahoma", "OK"),
        ("oregon", "OR"),
        ("pennsylvania", "PA"),
        ("rhode island", "RI"),
        ("south carolina", "SC"),
        ("south dakota", "SD"),
        ("tennessee", "TN"),
        ("texas", "TX"),
        ("utah", "UT"),
        ("vermont", "VT"),
        ("virginia", "VA"),
        ("washington", "WA"),
        ("west virginia", "WV"),
        ("wisconsin", "WI"),
        ("wyoming", "WY"),
        ("district of columbia", "DC"),
    ]
    .into_iter()
    .collect()
});

/// Spelled-out ordinals up to thirty.
pub static ORDINAL_WORDS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("first", 1),
        ("second", 2),
        ("third", 3),
        ("fourth", 4),
        ("fifth", 5),
        ("sixth", 6),
        ("seventh", 7),
        ("eighth", 8),
        ("ninth", 9),
        ("tenth", 10),
        ("eleventh", 11),
        ("twelfth", 12),
        ("thirteenth", 13),
        ("fourteenth", 14),
        ("fifteenth", 15),
        ("sixteenth", 16),
        ("seventeenth", 17),
        ("eighteenth", 18),
        ("nineteenth", 19),
        ("twentieth", 20),
        ("twenty-first", 21),
        ("twenty-second", 22),
        ("twenty-third", 23),
        ("twenty-fourth", 24),
        ("twenty-fifth", 25),
        ("twenty-sixth", 26),
        ("twenty-seventh", 27),
        ("twenty-eighth", 28),
        ("twenty-ninth", 29),
        ("thirtieth", 30),
    ]
    .into_iter()
    .collect()
});

/// Value of a single uppercase roman-numeral letter.
pub fn roman_value(c: char) -> Option<u32> {
    match c {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    }
}

/// Abbreviation expansions, most specific first. Each pattern eats the
/// abbreviation's trailing dot when present.
pub static ABBREV_REPLACEMENTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bint\.?\s+conf(?:\.|\b)", "International Conference"),
        (r"(?i)\bint\.?\s+symp(?:\.|\b)", "International Symposium"),
        (r"(?i)\bint\.?\s+worksh(?:\.|\b)", "International Workshop"),
        (r"(?i)\bint\.?\s+workshop\b", "International Workshop"),
        (r"(?i)\bintl\.?\s+conf(?:\.|\b)", "International Conference"),
        (r"(?i)\bconf(?:\.|\b)", "Conference"),
        (r"(?i)\bsymp(?:\.|\b)", "Symposium"),
        (r"(?i)\bworksh(?:\.|\b)", "Workshop"),
    ]
    .into_iter()
    .map(|(pat, repl)| (Regex::new(pat).unwrap(), repl))
    .collect()
});

/// Leading "Proceedings of (the) " publication wrapper.
pub static PROCEEDINGS_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*proceedings\s+of\s+(?:the\s+)?").unwrap());

/// Trailing ", Proceedings" / "Conference Proceedings" / "Workshop Proceedings".
pub static PROCEEDINGS_TRAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*,?\s*(?:proceedings?|conference\s+proceedings?|workshop\s+proceedings?)\s*$",
    )
    .unwrap()
});

/// "as part of", "as a part of", "held as part of", ...
pub static AS_PART_OF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:held\s+)?as\s+(?:a\s+)?part\s+of\b").unwrap());

/// Uppercase acronym immediately followed by a 19xx/20xx year.
pub static ACRONYM_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,})\s+(20[0-9]{2}|19[0-9]{2})\b").unwrap());

/// `<phrase> (<ACRONYM>)`.
pub static PAREN_ACRONYM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9][^()]+?)\s*\(([A-Z]{2,})\)").unwrap());

/// Long official country names collapsed to their common short form.
pub const COUNTRY_COLLAPSE: &[(&str, &str)] =
    &[("United Kingdom of Great Britain and Northern Ireland", "UK")];
