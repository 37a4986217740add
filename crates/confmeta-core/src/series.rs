//! Attach a normalized conference to its dblp series.
//!
//! Candidates come from the offline series index; the generator picks one of
//! them (or none) by number.

use std::path::Path;
use std::sync::{Arc, Mutex};

use confmeta_dblp::{SeriesCandidate, SeriesIndex};
use serde_json::Value;

use crate::generator::TextGenerator;
use crate::prompt::series_prompt;
use crate::{CoreError, SeriesMatch};

/// Reason recorded when the index has nothing resembling the name.
pub const NO_CANDIDATES_REASON: &str = "no dblp candidates";

/// The generator's pick among numbered candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesChoice {
    /// Zero-based index into the candidate list.
    pub index: Option<usize>,
    pub reason: String,
}

/// Parse the chooser's reply. `chosen_index` must be an integer in
/// `1..=count`; anything else means no choice.
pub fn parse_choice(text: &str, count: usize) -> SeriesChoice {
    let none = |reason: String| SeriesChoice {
        index: None,
        reason,
    };
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return none(String::new());
    };
    if end <= start {
        return none(String::new());
    }
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text[start..=end]) else {
        return none(String::new());
    };
    let reason = match obj.get("reason") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    match obj.get("chosen_index").and_then(Value::as_u64) {
        Some(i) if i >= 1 && (i as usize) <= count => SeriesChoice {
            index: Some(i as usize - 1),
            reason,
        },
        _ => none(reason),
    }
}

/// Matches conference names against the dblp series index.
pub struct SeriesMatcher {
    index: Mutex<SeriesIndex>,
    generator: Arc<dyn TextGenerator>,
    max_candidates: usize,
}

impl SeriesMatcher {
    pub fn new(index: SeriesIndex, generator: Arc<dyn TextGenerator>, max_candidates: usize) -> Self {
        Self {
            index: Mutex::new(index),
            generator,
            max_candidates,
        }
    }

    /// Open the index at `path`.
    pub fn open(
        path: &Path,
        generator: Arc<dyn TextGenerator>,
        max_candidates: usize,
    ) -> Result<Self, CoreError> {
        let index = SeriesIndex::open(path)?;
        tracing::info!(
            path = %path.display(),
            series = index.series_count().unwrap_or(0),
            "opened series index"
        );
        Ok(Self::new(index, generator, max_candidates))
    }

    fn candidates(&self, conf_name: &str) -> Result<Vec<SeriesCandidate>, String> {
        let index = self
            .index
            .lock()
            .map_err(|_| "series index lock poisoned".to_string())?;
        index
            .candidates(conf_name, self.max_candidates)
            .map_err(|e| e.to_string())
    }

    /// Find the series for a normalized name. Never fails: problems are
    /// reported through [`SeriesMatch::reason`].
    pub async fn match_series(&self, conf_name: &str, conf_dates: &str) -> SeriesMatch {
        if conf_name.trim().is_empty() {
            return SeriesMatch::unmatched("empty conference name");
        }
        let candidates = match self.candidates(conf_name) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, conf_name, "series candidate lookup failed");
                return SeriesMatch::unmatched(format!("series lookup failed: {e}"));
            }
        };
        if candidates.is_empty() {
            return SeriesMatch::unmatched(NO_CANDIDATES_REASON);
        }

        let listing: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (c.slug.as_str(), c.name.as_str()))
            .collect();
        let prompt = series_prompt(conf_name, conf_dates, &listing);
        let text = match self.generator.generate(&prompt, None).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, conf_name, "series chooser failed");
                return SeriesMatch::unmatched(format!("series lookup failed: {e}"));
            }
        };

        let choice = parse_choice(&text, candidates.len());
        match choice.index.and_then(|i| candidates.get(i)) {
            Some(c) => {
                tracing::debug!(conf_name, slug = %c.slug, "series matched");
                SeriesMatch {
                    slug: Some(c.slug.clone()),
                    stream_iri: Some(c.stream_iri.clone()),
                    name: Some(c.name.clone()),
                    reason: choice.reason,
                }
            }
            None => SeriesMatch::unmatched(choice.reason),
        }
    }
}
