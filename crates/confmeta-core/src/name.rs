//! Conference-name normalization and restoration of details the extractor
//! tends to drop.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::{
    ABBREV_REPLACEMENTS, ACRONYM_OVERRIDES, ACRONYM_YEAR_RE, AS_PART_OF_RE, PAREN_ACRONYM_RE,
    PROCEEDINGS_PREFIX_RE, PROCEEDINGS_TRAIL_RE, SMALL_WORDS,
};

/// Expand common abbreviations ("Int. Conf." → "International Conference").
pub fn expand_abbreviations(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in ABBREV_REPLACEMENTS.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// At least one uppercase character and no lowercase ones.
fn is_all_upper(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase()) && !word.chars().any(|c| c.is_lowercase())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Split a token into its leading ASCII-alphanumeric run and the remainder.
/// Tokens not starting with an alphanumeric are returned whole.
fn split_alnum(token: &str) -> (&str, &str) {
    let end = token
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    if end == 0 {
        (token, "")
    } else {
        token.split_at(end)
    }
}

fn case_word(word: &str, start_of_segment: bool) -> String {
    let lower = word.to_lowercase();
    if let Some(canonical) = ACRONYM_OVERRIDES.get(lower.as_str()) {
        return (*canonical).to_string();
    }
    if word.chars().count() > 1 && is_all_upper(word) {
        return word.to_string();
    }
    if start_of_segment {
        return capitalize(word);
    }
    if SMALL_WORDS.contains(lower.as_str()) {
        return lower;
    }
    capitalize(word)
}

/// Title-case a name, keeping whitespace runs intact.
///
/// Connector words stay lowercase except at the start of a segment (the
/// beginning of the string or the word after a token containing `:`).
/// All-uppercase acronyms are preserved; the tail of a token after its
/// alphanumeric run (`-Robot`, `/IEEE`, `,`) is kept verbatim.
pub fn smart_title_case(text: &str) -> String {
    static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    fn push_token(out: &mut String, token: &str, start: &mut bool) {
        if token.is_empty() {
            return;
        }
        let (word, rest) = split_alnum(token);
        out.push_str(&case_word(word, *start));
        out.push_str(rest);
        *start = token.contains(':');
    }

    let mut out = String::with_capacity(text.len());
    let mut start_of_segment = true;
    let mut last = 0;

    for ws in WS_RE.find_iter(text) {
        push_token(&mut out, &text[last..ws.start()], &mut start_of_segment);
        out.push_str(ws.as_str());
        last = ws.end();
    }
    push_token(&mut out, &text[last..], &mut start_of_segment);
    out
}

/// Drop "Proceedings of (the)" prefixes and trailing "Proceedings"
/// suffixes, then trim stray spaces and commas. Repeats until nothing
/// more is removed.
pub fn strip_proceedings(name: &str) -> String {
    let mut current = name.trim_matches(|c| c == ' ' || c == ',').to_string();
    loop {
        let s = PROCEEDINGS_PREFIX_RE.replace(&current, "");
        let s = PROCEEDINGS_TRAIL_RE.replace(&s, "");
        let next = s.trim_matches(|c| c == ' ' || c == ',').to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Capitalize a connector word left at the start of `name`, as after
/// "Proceedings of an ..." loses its prefix.
fn capitalize_leading_connector(name: String) -> String {
    let (first, _) = split_alnum(&name);
    if SMALL_WORDS.contains(first) {
        return format!("{}{}", capitalize(first), &name[first.len()..]);
    }
    name
}

/// Trim, expand abbreviations, title-case, strip publication wrappers.
pub fn normalize_name(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }
    capitalize_leading_connector(strip_proceedings(&smart_title_case(
        &expand_abbreviations(text),
    )))
}

/// Position of the first whole-word occurrence of `word` in `haystack`.
fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(word))).ok()?;
    re.find(haystack).map(|m| m.end())
}

/// Restore details of the raw listing the extracted name lost.
///
/// Applied in order:
/// 1. when the raw text says "held as part of ...", the whole raw text
///    (normalized) replaces the name so the host event survives;
/// 2. an `ACRONYM YEAR` pair in the raw text gets its year re-attached after
///    the acronym in the name;
/// 3. a `Full Name (ACR)` phrase in the raw text gets its parenthesized
///    acronym re-attached in the name.
pub fn restore_name(raw: &str, name: &str) -> String {
    let mut name = if AS_PART_OF_RE.is_match(raw) {
        normalize_name(raw)
    } else {
        name.to_string()
    };

    if let Some(caps) = ACRONYM_YEAR_RE.captures(raw) {
        let acronym = &caps[1];
        let year = &caps[2];
        let tagged = format!("{acronym} {year}");
        if !name.contains(&tagged)
            && let Some(end) = find_word(&name, acronym)
        {
            name.insert_str(end, &format!(" {year}"));
        }
    }

    if let Some(caps) = PAREN_ACRONYM_RE.captures(raw) {
        let full = caps[1].trim();
        let acronym = &caps[2];
        let with_parens = format!("{full} ({acronym})");
        let with_space = format!("{full} {acronym}");
        if !name.contains(&with_parens) && !name.contains(&with_space) && name.contains(full) {
            name = name.replacen(full, &with_parens, 1);
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_international_abbreviations() {
        assert_eq!(
            expand_abbreviations("Int. Conf. on Fatigue"),
            "International Conference on Fatigue"
        );
        assert_eq!(
            expand_abbreviations("intl conf on X"),
            "International Conference on X"
        );
        assert_eq!(
            expand_abbreviations("Int Symp. Robotics"),
            "International Symposium Robotics"
        );
        assert_eq!(
            expand_abbreviations("Int. Worksh. on Y"),
            "International Workshop on Y"
        );
        assert_eq!(
            expand_abbreviations("int. workshop on Y"),
            "International Workshop on Y"
        );
    }

    #[test]
    fn expands_bare_abbreviations() {
        assert_eq!(expand_abbreviations("ACM Conf. 2019"), "ACM Conference 2019");
        assert_eq!(expand_abbreviations("Symp on Z"), "Symposium on Z");
        assert_eq!(expand_abbreviations("Worksh. on Z"), "Workshop on Z");
    }

    #[test]
    fn full_words_untouched() {
        let s = "Conference and Symposium and Workshop";
        assert_eq!(expand_abbreviations(s), s);
        assert_eq!(expand_abbreviations("Confluence"), "Confluence");
    }

    #[test]
    fn title_case_small_words() {
        assert_eq!(
            smart_title_case("international conference on the theory of things"),
            "International Conference on the Theory of Things"
        );
        assert_eq!(smart_title_case("the art of war"), "The Art of War");
    }

    #[test]
    fn title_case_segment_after_colon() {
        assert_eq!(
            smart_title_case("robotics: the next decade"),
            "Robotics: The Next Decade"
        );
    }

    #[test]
    fn title_case_preserves_acronyms_and_tails() {
        assert_eq!(
            smart_title_case("20th annual ACM/IEEE conference on human-robot interaction, HRI"),
            "20th Annual ACM/IEEE Conference on Human-robot Interaction, HRI"
        );
        assert_eq!(smart_title_case("eccomas congress"), "ECCOMAS Congress");
        assert_eq!(smart_title_case("SC23: high performance"), "SC23: High Performance");
    }

    #[test]
    fn title_case_keeps_whitespace_runs() {
        assert_eq!(smart_title_case("a  b\tc"), "A  B\tC");
    }

    #[test]
    fn single_letter_uppercase_is_not_an_acronym() {
        assert_eq!(smart_title_case("section b of"), "Section B of");
        // a lone "A" is the article, not an acronym
        assert_eq!(smart_title_case("x A"), "X a");
    }

    #[test]
    fn strips_proceedings_wrappers() {
        assert_eq!(
            strip_proceedings("Proceedings of the 7th Workshop on X"),
            "7th Workshop on X"
        );
        assert_eq!(strip_proceedings("proceedings of Foo"), "Foo");
        assert_eq!(strip_proceedings("Foo Symposium, Proceedings"), "Foo Symposium");
        assert_eq!(strip_proceedings("Foo Workshop Proceedings"), "Foo");
        assert_eq!(strip_proceedings("Foo Conference Proceedings"), "Foo");
    }

    #[test]
    fn normalize_name_examples() {
        assert_eq!(
            normalize_name("  Proceedings of the Int. Conf. on fatigue  "),
            "International Conference on Fatigue"
        );
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn normalize_name_is_idempotent() {
        for raw in [
            "Proceedings of the 7th Int. Conf. on fatigue",
            "20th Annual ACM/IEEE International Conference on Human-Robot Interaction, HRI 2025",
            "eccomas congress 2016",
            "robotics: the next decade",
            "IEEE ICASSP 2008, Las Vegas",
            "Int. Symp. on Things, Proceedings",
            "Proceedings of an International Conference on X",
            "proceedings of a workshop on Y",
            "Proceedings of the the Z Meeting",
            "Proceedings of Proceedings of W Symposium",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "{raw}");
        }
    }

    #[test]
    fn leading_connector_after_prefix_is_capitalized() {
        assert_eq!(
            normalize_name("Proceedings of an International Conference on X"),
            "An International Conference on X"
        );
        assert_eq!(normalize_name("Proceedings of a workshop on Y"), "A Workshop on Y");
        assert_eq!(normalize_name("Proceedings of the the Z Meeting"), "The Z Meeting");
    }

    #[test]
    fn nested_wrappers_are_stripped_in_one_pass() {
        assert_eq!(
            strip_proceedings("Proceedings of Proceedings of W Symposium, Proceedings"),
            "W Symposium"
        );
    }

    #[test]
    fn restore_as_part_of() {
        let raw = "Workshop on X, held as part of ECAI 2020, Santiago";
        let restored = restore_name(raw, "Workshop on X");
        assert_eq!(restored, "Workshop on X, Held As Part of ECAI 2020, Santiago");
    }

    #[test]
    fn restore_acronym_year() {
        let raw = "ICASSP 2008, Las Vegas, Nevada";
        assert_eq!(
            restore_name(raw, "IEEE Conference on Acoustics, ICASSP"),
            "IEEE Conference on Acoustics, ICASSP 2008"
        );
        // already present
        assert_eq!(restore_name(raw, "ICASSP 2008"), "ICASSP 2008");
        // acronym only as a substring of a longer word
        assert_eq!(restore_name("IC 2008, Rome", "ICC Meeting"), "ICC Meeting");
    }

    #[test]
    fn restore_parenthesized_acronym() {
        let raw = "2011 American Control Conference (ACC), San Francisco, CA";
        assert_eq!(
            restore_name(raw, "2011 American Control Conference"),
            "2011 American Control Conference (ACC)"
        );
        assert_eq!(
            restore_name(raw, "2011 American Control Conference ACC"),
            "2011 American Control Conference ACC"
        );
    }

    #[test]
    fn restore_leaves_unrelated_names() {
        assert_eq!(
            restore_name("Some listing 2019", "Some Listing"),
            "Some Listing"
        );
    }
}
