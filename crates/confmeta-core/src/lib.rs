use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod config_file;
pub mod dates;
pub mod decode;
pub mod extractor;
pub mod gate;
pub mod gazetteer;
pub mod generator;
pub mod name;
pub mod order;
pub mod pipeline;
pub mod place;
pub mod prompt;
pub mod rules;
pub mod series;

// Re-export for convenience
pub use cache::{ExtractionCache, Lookup};
pub use dates::{DateParts, DateRange, DateShape, decompose};
pub use decode::{DecodeError, decode};
pub use extractor::Extractor;
pub use gate::{admit, has_date_signal};
pub use gazetteer::Gazetteer;
pub use generator::{ChunkSink, OllamaGenerator, TextGenerator, TransportError};
pub use name::normalize_name;
pub use order::extract_order;
pub use pipeline::Pipeline;
pub use place::normalize_place;
pub use prompt::InstructionTemplate;
pub use series::SeriesMatcher;

/// Note attached when a listing never reaches the extractor.
pub const GATE_SKIP_NOTE: &str = "no date detected or skipped by heuristic";
/// Note appended when the country was looked up from the city.
pub const COUNTRY_INFERRED_NOTE: &str = "country inferred from GeoNames";
/// Reason recorded when series matching is off.
pub const SERIES_DISABLED_REASON: &str = "dblp lookup disabled";

/// Name, place and date range of one listing, as cached per raw string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub name: String,
    pub place: String,
    /// Canonical range string (`YYYY-MM-DD / YYYY-MM-DD` and friends) or empty.
    pub dates: String,
    pub note: String,
}

/// One input row from the listing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceRow {
    pub pid: i64,
    pub name_seq: i64,
    pub raw: Option<String>,
}

/// dblp series attached to a record, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesMatch {
    pub slug: Option<String>,
    pub stream_iri: Option<String>,
    pub name: Option<String>,
    pub reason: String,
}

impl SeriesMatch {
    pub fn disabled() -> Self {
        Self {
            reason: SERIES_DISABLED_REASON.to_string(),
            ..Self::default()
        }
    }

    pub fn unmatched(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }
}

/// Fully normalized output for one input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    pub pid: i64,
    pub name_seq: i64,
    pub raw_conference: Option<String>,
    pub conf_name: String,
    pub conf_place: String,
    pub conf_dates: String,
    pub start: DateParts,
    pub end: DateParts,
    pub conf_order: Option<u32>,
    pub series: SeriesMatch,
    pub note: String,
}

impl ParsedRecord {
    /// `YYYY-MM-DD` of the first day, when fully known.
    pub fn start_date(&self) -> Option<String> {
        self.start.to_iso()
    }

    /// `YYYY-MM-DD` of the last day, when fully known.
    pub fn end_date(&self) -> Option<String> {
        self.end.to_iso()
    }
}

/// How a row's extraction result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Fresh generator call.
    Extracted,
    /// Served from the extraction cache.
    Cached,
    /// Rejected by the gate; raw fallback.
    Skipped,
    /// Generator failed; raw fallback, not cached.
    Failed,
}

/// Progress events emitted while a run proceeds.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A row is about to be processed.
    Row {
        index: usize,
        total: usize,
        pid: i64,
        name_seq: i64,
        raw: Option<String>,
    },
    /// Completion fragment for a row selected for streaming display.
    StreamChunk { text: String },
    /// A row finished.
    Parsed {
        index: usize,
        total: usize,
        outcome: RowOutcome,
        record: Box<ParsedRecord>,
    },
    /// A row fell back because the generator failed.
    Warning {
        index: usize,
        total: usize,
        pid: i64,
        name_seq: i64,
        message: String,
    },
}

/// Summary statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub extracted: usize,
    pub cached: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the run stopped early on cancellation.
    pub cancelled: bool,
}

impl RunStats {
    pub fn record(&mut self, outcome: RowOutcome) {
        self.total += 1;
        match outcome {
            RowOutcome::Extracted => self.extracted += 1,
            RowOutcome::Cached => self.cached += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to read gazetteer {}: {source}", path.display())]
    Gazetteer {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create cache directory {}: {source}", path.display())]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("series index error: {0}")]
    Series(#[from] confmeta_dblp::DblpError),
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_url: String,
    pub model: String,
    pub timeout: Option<Duration>,
    /// Use the detailed template and keep the generator's note.
    pub include_note: bool,
    /// Stream every n-th row's completion to the progress callback.
    pub show_every: usize,
    pub db_path: Option<PathBuf>,
    pub gazetteer_path: PathBuf,
    pub cache_path: Option<PathBuf>,
    pub series_db_path: Option<PathBuf>,
    pub max_rows: usize,
    pub input_table: String,
    pub output_table: String,
    pub csv_sample_path: Option<PathBuf>,
    pub series_matching: bool,
    pub max_series_candidates: usize,
    /// Empty the extraction cache (both tiers) before the run.
    pub clear_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_url: generator::ollama::DEFAULT_URL.to_string(),
            model: generator::ollama::DEFAULT_MODEL.to_string(),
            timeout: None,
            include_note: false,
            show_every: 10,
            db_path: None,
            gazetteer_path: PathBuf::from("~/geonames/cities5000.txt"),
            cache_path: None,
            series_db_path: None,
            max_rows: 1000,
            input_table: "names_conference".to_string(),
            output_table: "names_conference_parsed".to_string(),
            csv_sample_path: Some(PathBuf::from("names_conference_parsed_sample.csv")),
            series_matching: false,
            max_series_candidates: 10,
            clear_cache: false,
        }
    }
}
