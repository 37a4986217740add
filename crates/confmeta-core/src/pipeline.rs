//! Row-by-row driver: gate, extract, normalize, decompose.

use tokio_util::sync::CancellationToken;

use crate::extractor::Extractor;
use crate::gate;
use crate::generator::ChunkSink;
use crate::name::normalize_name;
use crate::order::extract_order;
use crate::series::SeriesMatcher;
use crate::{
    ConferenceRow, ExtractionResult, GATE_SKIP_NOTE, ParsedRecord, ProgressEvent, RowOutcome,
    RunStats, SeriesMatch, dates,
};

/// Reason recorded for rows that never produced an extraction.
pub const SERIES_SKIPPED_REASON: &str = "no extraction to match";

pub struct Pipeline {
    extractor: Extractor,
    series: Option<SeriesMatcher>,
    show_every: usize,
}

impl Pipeline {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            series: None,
            show_every: 10,
        }
    }

    pub fn with_series(mut self, series: Option<SeriesMatcher>) -> Self {
        self.series = series;
        self
    }

    /// Stream the completion of every n-th row (1-based). Zero disables it.
    pub fn with_show_every(mut self, show_every: usize) -> Self {
        self.show_every = show_every;
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    fn streams(&self, index: usize) -> bool {
        self.show_every > 0 && index % self.show_every == 0
    }

    /// Process rows in order. On cancellation the records finished so far are
    /// returned and `RunStats::cancelled` is set.
    pub async fn run<P>(
        &self,
        rows: Vec<ConferenceRow>,
        progress: P,
        cancel: &CancellationToken,
    ) -> (Vec<ParsedRecord>, RunStats)
    where
        P: Fn(ProgressEvent) + Send + Sync,
    {
        let total = rows.len();
        let mut records = Vec::with_capacity(total);
        let mut stats = RunStats::default();

        for (i, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(done = i, total, "run cancelled");
                stats.cancelled = true;
                break;
            }
            let (record, outcome) = self.parse_row(i + 1, total, row, &progress).await;
            stats.record(outcome);
            progress(ProgressEvent::Parsed {
                index: i + 1,
                total,
                outcome,
                record: Box::new(record.clone()),
            });
            records.push(record);
        }

        tracing::info!(
            total = stats.total,
            extracted = stats.extracted,
            cached = stats.cached,
            skipped = stats.skipped,
            failed = stats.failed,
            "run finished"
        );
        (records, stats)
    }

    /// Turn one row into a record. Every row yields a record; failures are
    /// folded into the note.
    pub async fn parse_row<P>(
        &self,
        index: usize,
        total: usize,
        row: &ConferenceRow,
        progress: &P,
    ) -> (ParsedRecord, RowOutcome)
    where
        P: Fn(ProgressEvent) + Send + Sync,
    {
        progress(ProgressEvent::Row {
            index,
            total,
            pid: row.pid,
            name_seq: row.name_seq,
            raw: row.raw.clone(),
        });

        let raw = row.raw.as_deref().unwrap_or("");
        let (result, outcome) = if gate::admit(row.raw.as_deref()) {
            let forward = |s: &str| {
                progress(ProgressEvent::StreamChunk {
                    text: s.to_string(),
                })
            };
            let sink: Option<&ChunkSink<'_>> = if self.streams(index) {
                Some(&forward)
            } else {
                None
            };
            match self.extractor.extract(raw, sink).await {
                Ok(lookup) if lookup.cached => {
                    tracing::debug!(pid = row.pid, "cache hit");
                    (lookup.result, RowOutcome::Cached)
                }
                Ok(lookup) => (lookup.result, RowOutcome::Extracted),
                Err(e) => {
                    tracing::warn!(
                        pid = row.pid,
                        name_seq = row.name_seq,
                        error = %e,
                        "extraction failed"
                    );
                    progress(ProgressEvent::Warning {
                        index,
                        total,
                        pid: row.pid,
                        name_seq: row.name_seq,
                        message: e.to_string(),
                    });
                    let fallback = ExtractionResult {
                        name: normalize_name(raw),
                        note: format!("LLM error: {e}"),
                        ..ExtractionResult::default()
                    };
                    (fallback, RowOutcome::Failed)
                }
            }
        } else {
            tracing::debug!(pid = row.pid, "gate rejected listing");
            let fallback = ExtractionResult {
                name: normalize_name(raw),
                note: GATE_SKIP_NOTE.to_string(),
                ..ExtractionResult::default()
            };
            (fallback, RowOutcome::Skipped)
        };

        let series = match (&self.series, outcome) {
            (None, _) => SeriesMatch::disabled(),
            (Some(matcher), RowOutcome::Extracted | RowOutcome::Cached) => {
                matcher.match_series(&result.name, &result.dates).await
            }
            (Some(_), _) => SeriesMatch::unmatched(SERIES_SKIPPED_REASON),
        };

        (assemble(row, result, series), outcome)
    }
}

fn assemble(row: &ConferenceRow, result: ExtractionResult, series: SeriesMatch) -> ParsedRecord {
    let range = dates::decompose(&result.dates);
    ParsedRecord {
        pid: row.pid,
        name_seq: row.name_seq,
        raw_conference: row.raw.clone(),
        conf_order: extract_order(&result.name),
        conf_name: result.name,
        conf_place: result.place,
        conf_dates: result.dates,
        start: range.start,
        end: range.end,
        series,
        note: result.note,
    }
}
