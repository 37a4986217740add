//! Decomposition of the canonical date-range string into components.
//!
//! Accepted grammar (after trimming):
//!
//! ```text
//! range := token ( ws* "/" ws* token )?
//! token := YYYY ( "-" MM ( "-" DD )? )?
//! ```
//!
//! Anything else decomposes to all-null.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{4}(?:-[0-9]{2}(?:-[0-9]{2})?)?)(?:\s*/\s*([0-9]{4}(?:-[0-9]{2}(?:-[0-9]{2})?)?))?$",
    )
    .unwrap()
});

/// Year, month and day of one end of a range. Components the source did not
/// state are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// The four shapes the extractor is instructed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShape {
    /// `YYYY-MM-DD / YYYY-MM-DD`
    DayRange,
    /// `YYYY-MM-DD`
    SingleDay,
    /// `YYYY-MM / YYYY-MM`
    MonthRange,
    /// `YYYY / YYYY`
    YearRange,
}

/// Start and end of a conference date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateParts,
    pub end: DateParts,
}

impl DateParts {
    fn from_token(token: &str) -> Self {
        let mut pieces = token.split('-');
        Self {
            year: pieces.next().and_then(|p| p.parse().ok()),
            month: pieces.next().and_then(|p| p.parse().ok()),
            day: pieces.next().and_then(|p| p.parse().ok()),
        }
    }

    /// `YYYY-MM-DD`, only when all three components are known.
    pub fn to_iso(&self) -> Option<String> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => Some(format!("{y:04}-{m:02}-{d:02}")),
            _ => None,
        }
    }

    fn render_token(&self) -> Option<String> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => Some(format!("{y:04}-{m:02}-{d:02}")),
            (Some(y), Some(m), None) => Some(format!("{y:04}-{m:02}")),
            (Some(y), None, None) => Some(format!("{y:04}")),
            _ => None,
        }
    }

    fn granularity(&self) -> u8 {
        match (self.year, self.month, self.day) {
            (Some(_), Some(_), Some(_)) => 3,
            (Some(_), Some(_), None) => 2,
            (Some(_), None, None) => 1,
            _ => 0,
        }
    }
}

impl DateRange {
    /// True when no component at all is known.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Classify a range string into one of the canonical [`DateShape`]s.
    /// Grammar-valid strings outside those shapes (mixed precision, a lone
    /// year) return `None`.
    pub fn shape_of(dates: &str) -> Option<DateShape> {
        let caps = RANGE_RE.captures(dates.trim())?;
        let start = DateParts::from_token(caps.get(1)?.as_str());
        match caps.get(2) {
            None if start.granularity() == 3 => Some(DateShape::SingleDay),
            None => None,
            Some(end) => {
                let end = DateParts::from_token(end.as_str());
                match (start.granularity(), end.granularity()) {
                    (3, 3) => Some(DateShape::DayRange),
                    (2, 2) => Some(DateShape::MonthRange),
                    (1, 1) => Some(DateShape::YearRange),
                    _ => None,
                }
            }
        }
    }

    /// Rebuild the canonical string for `shape` from the known components.
    pub fn render(&self, shape: DateShape) -> Option<String> {
        match shape {
            DateShape::SingleDay => self.start.to_iso(),
            DateShape::DayRange | DateShape::MonthRange | DateShape::YearRange => Some(format!(
                "{} / {}",
                self.start.render_token()?,
                self.end.render_token()?
            )),
        }
    }
}

/// Split a canonical range string into start and end components.
///
/// A single token yields identical start and end. Input outside the grammar
/// (including the empty string) yields an all-null range.
pub fn decompose(dates: &str) -> DateRange {
    let Some(caps) = RANGE_RE.captures(dates.trim()) else {
        return DateRange::default();
    };
    let Some(first) = caps.get(1) else {
        return DateRange::default();
    };
    let start = DateParts::from_token(first.as_str());
    let end = caps
        .get(2)
        .map(|m| DateParts::from_token(m.as_str()))
        .unwrap_or(start);
    DateRange { start, end }
}
