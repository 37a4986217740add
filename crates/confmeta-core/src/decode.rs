//! Recover the structured payload from free-form generator output.
//!
//! The generator is asked for a bare JSON object but routinely wraps it in
//! prose or code fences, or stops mid-object. [`decode`] locates the first
//! brace-balanced `{...}` span and parses it; it never panics and every
//! failure maps to a [`DecodeError`] with a stable fallback note.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no JSON object in generator output")]
    NoObjectFound,
    #[error("unbalanced braces in generator output")]
    UnbalancedBraces,
    #[error("malformed JSON payload: {0}")]
    MalformedPayload(String),
}

impl DecodeError {
    /// Note recorded on a fallback result.
    pub fn fallback_note(&self) -> &'static str {
        match self {
            DecodeError::NoObjectFound => "fallback: could not find JSON object",
            DecodeError::UnbalancedBraces => "fallback: could not parse JSON",
            DecodeError::MalformedPayload(_) => "fallback: JSON decode error",
        }
    }
}

/// Fields recognized in a decoded payload. Missing or null values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
    pub place: String,
    pub dates: String,
    pub note: String,
}

impl Payload {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            name: field(map, &["conf_name", "name"]),
            place: field(map, &["conf_place", "place"]),
            dates: field(map, &["conf_dates", "dates"]),
            note: field(map, &["note"]),
        }
    }
}

/// First string value among `keys`. Nulls, numbers, arrays and objects
/// count as absent.
fn field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_default()
}

/// The first `{` and its matching `}`, counting raw braces.
pub fn object_span(text: &str) -> Result<&str, DecodeError> {
    let start = text.find('{').ok_or(DecodeError::NoObjectFound)?;
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    Err(DecodeError::UnbalancedBraces)
}

/// Parse generator output into a [`Payload`].
pub fn decode(text: &str) -> Result<Payload, DecodeError> {
    let span = object_span(text)?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(Payload::from_map(&map)),
        Ok(other) => Err(DecodeError::MalformedPayload(format!(
            "expected object, got {other}"
        ))),
        Err(e) => Err(DecodeError::MalformedPayload(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_clean_object() {
        let p = decode(
            r#"{"conf_name":"ECCOMAS Congress 2016","conf_place":"Crete Island, Greece","conf_dates":"2016-06 / 2016-06","note":""}"#,
        )
        .unwrap();
        assert_eq!(p.name, "ECCOMAS Congress 2016");
        assert_eq!(p.place, "Crete Island, Greece");
        assert_eq!(p.dates, "2016-06 / 2016-06");
        assert_eq!(p.note, "");
    }

    #[test]
    fn decodes_object_inside_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n{\"name\": \"X\", \"dates\": \"2019\"}\n```\nAnything else?";
        let p = decode(text).unwrap();
        assert_eq!(p.name, "X");
        assert_eq!(p.dates, "2019");
        assert_eq!(p.place, "");
    }

    #[test]
    fn primary_keys_win_over_aliases() {
        let p = decode(r#"{"name":"alias","conf_name":"primary"}"#).unwrap();
        assert_eq!(p.name, "primary");
        let p = decode(r#"{"name":"alias","conf_name":null}"#).unwrap();
        assert_eq!(p.name, "alias");
    }

    #[test]
    fn non_string_values_read_as_empty() {
        let p = decode(r#"{"conf_name": 42, "conf_place": ["a"], "conf_dates": null}"#).unwrap();
        assert_eq!(p.name, "");
        assert_eq!(p.place, "");
        assert_eq!(p.dates, "");

        let p = decode(r#"{"conf_name": {"x": 1}, "name": "alias", "note": true}"#).unwrap();
        assert_eq!(p.name, "alias");
        assert_eq!(p.note, "");
    }

    #[test]
    fn first_balanced_object_only() {
        let span = object_span(r#"a {"x": {"y": 1}} b {"z": 2}"#).unwrap();
        assert_eq!(span, r#"{"x": {"y": 1}}"#);
    }

    #[test]
    fn no_object() {
        assert_eq!(decode("no json here"), Err(DecodeError::NoObjectFound));
        assert_eq!(decode(""), Err(DecodeError::NoObjectFound));
        assert_eq!(decode("}{"), Err(DecodeError::UnbalancedBraces));
    }

    #[test]
    fn truncated_object() {
        assert_eq!(
            decode(r#"{"conf_name": "Half"#),
            Err(DecodeError::UnbalancedBraces)
        );
    }

    #[test]
    fn malformed_object() {
        let err = decode("{conf_name: 'single quotes'}").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload(_)));
        assert_eq!(err.fallback_note(), "fallback: JSON decode error");
    }

    #[test]
    fn fallback_notes() {
        assert_eq!(
            DecodeError::NoObjectFound.fallback_note(),
            "fallback: could not find JSON object"
        );
        assert_eq!(
            DecodeError::UnbalancedBraces.fallback_note(),
            "fallback: could not parse JSON"
        );
    }

    #[test]
    fn never_panics_on_odd_input() {
        for text in ["{", "}", "{{}", "{\u{0}}", "ü{ä}ö", "{\"a\":\"}\"}"] {
            let _ = decode(text);
        }
    }
}
