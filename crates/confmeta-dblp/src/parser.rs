//! N-Triples line parser for the dblp RDF dump.

/// `rdf:type` predicate.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdfs:label` predicate.
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
/// Class of dblp conference series streams.
pub const DBLP_CONFERENCE: &str = "https://dblp.org/rdf/schema#Conference";

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Iri(String),
    /// Unescaped literal text, with datatype or language tag dropped.
    Literal(String),
}

/// A parsed RDF triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple<'a> {
    pub subject: &'a str,
    pub predicate: &'a str,
    pub object: Object,
}

/// Parse one N-Triples line.
///
/// Accepts `<s> <p> <o> .` and `<s> <p> "literal"[^^<type>|@lang] .`. Comments,
/// blank lines and anything malformed yield `None`.
pub fn parse_line(line: &str) -> Option<Triple<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (subject, rest) = take_iri(line)?;
    let (predicate, rest) = take_iri(rest.trim_start())?;
    let rest = rest.trim_start();
    let (object, rest) = if rest.starts_with('<') {
        let (iri, rest) = take_iri(rest)?;
        (Object::Iri(iri.to_string()), rest)
    } else {
        let (text, rest) = take_literal(rest)?;
        (Object::Literal(text), rest)
    };

    if rest.trim() != "." {
        return None;
    }

    Some(Triple {
        subject,
        predicate,
        object,
    })
}

/// Cheap pre-check for lines declaring a conference series, used to avoid
/// full parsing of the billions of unrelated triples in the dump.
pub fn mentions_conference_type(line: &str) -> bool {
    line.contains(DBLP_CONFERENCE) && line.contains(RDF_TYPE)
}

fn take_iri(s: &str) -> Option<(&str, &str)> {
    let body = s.strip_prefix('<')?;
    let end = body.find('>')?;
    Some((&body[..end], &body[end + 1..]))
}

fn take_literal(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    let mut close = None;

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                close = Some(i);
                break;
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'u')) => push_code_point(&mut out, &mut chars, 4),
                Some((_, 'U')) => push_code_point(&mut out, &mut chars, 8),
                Some((_, other)) => out.push(other),
                None => return None,
            },
            _ => out.push(c),
        }
    }

    let rest = &body[close? + 1..];
    let rest = if let Some(typed) = rest.strip_prefix("^^") {
        take_iri(typed).map(|(_, r)| r).unwrap_or(typed)
    } else if let Some(tagged) = rest.strip_prefix('@') {
        tagged.trim_start_matches(|c: char| !c.is_whitespace())
    } else {
        rest
    };

    Some((out, rest))
}

fn push_code_point(out: &mut String, chars: &mut std::str::CharIndices<'_>, digits: usize) {
    let hex: String = chars.by_ref().take(digits).map(|(_, h)| h).collect();
    if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        out.push(ch);
    }
}

/// Last non-empty path segment of an IRI, e.g. `https://dblp.org/streams/conf/aaai` → `aaai`.
pub fn iri_to_slug(iri: &str) -> &str {
    let path = iri
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(iri);
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.rsplit('/').find(|seg| !seg.is_empty()).unwrap_or("")
}
