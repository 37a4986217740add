use std::io::Write;

use confmeta_core::{ParsedRecord, ProgressEvent, RunStats, SeriesMatch};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn or_none(v: Option<String>) -> String {
    v.unwrap_or_else(|| "None".to_string())
}

/// Prints progress events as a per-row report. Tracks whether a streamed
/// completion is in flight so it can be closed with a newline.
pub struct RowPrinter {
    color: ColorMode,
    streaming: bool,
}

impl RowPrinter {
    pub fn new(color: ColorMode) -> Self {
        Self {
            color,
            streaming: false,
        }
    }

    fn end_stream(&mut self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.streaming {
            writeln!(w)?;
            writeln!(w)?;
            self.streaming = false;
        }
        Ok(())
    }

    pub fn print(&mut self, w: &mut dyn Write, event: &ProgressEvent) -> std::io::Result<()> {
        match event {
            ProgressEvent::Row {
                index,
                total,
                pid,
                name_seq,
                raw,
            } => {
                let header = format!("=== {index}/{total} PID {pid} name_seq {name_seq} ===");
                writeln!(w)?;
                if self.color.enabled() {
                    writeln!(w, "{}", header.bold().cyan())?;
                } else {
                    writeln!(w, "{header}")?;
                }
                writeln!(w, "RAW: {}", raw.as_deref().unwrap_or("None"))?;
            }
            ProgressEvent::StreamChunk { text } => {
                if !self.streaming {
                    self.streaming = true;
                    writeln!(w, "LLM output (streaming):")?;
                }
                if self.color.enabled() {
                    write!(w, "{}", text.dimmed())?;
                } else {
                    write!(w, "{text}")?;
                }
            }
            ProgressEvent::Warning {
                pid,
                name_seq,
                message,
                ..
            } => {
                self.end_stream(w)?;
                let msg = format!("LLM error for PID {pid} name_seq {name_seq}: {message}");
                if self.color.enabled() {
                    writeln!(w, "{}", msg.yellow())?;
                } else {
                    writeln!(w, "{msg}")?;
                }
            }
            ProgressEvent::Parsed { record, .. } => {
                self.end_stream(w)?;
                print_record(w, record, self.color)?;
            }
        }
        Ok(())
    }
}

pub fn print_record(
    w: &mut dyn Write,
    record: &ParsedRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    let line = format!(
        "name='{}' | place='{}' | dates='{}' | start='{}' | end='{}' | order={}",
        record.conf_name,
        record.conf_place,
        record.conf_dates,
        or_none(record.start_date()),
        or_none(record.end_date()),
        or_none(record.conf_order.map(|o| o.to_string())),
    );
    if color.enabled() {
        writeln!(w, "{} {}", "PARSED:".green(), line)?;
    } else {
        writeln!(w, "PARSED: {line}")?;
    }
    if !record.note.is_empty() {
        if color.enabled() {
            writeln!(w, "{} {}", "NOTE:".yellow(), record.note)?;
        } else {
            writeln!(w, "NOTE: {}", record.note)?;
        }
    }
    writeln!(w, "DBLP: {}", describe_series(&record.series))?;
    Ok(())
}

fn describe_series(series: &SeriesMatch) -> String {
    match (&series.slug, &series.name) {
        (Some(slug), Some(name)) => format!("{slug} ({name})"),
        (Some(slug), None) => slug.clone(),
        _ if series.reason == confmeta_core::SERIES_DISABLED_REASON => "lookup disabled".into(),
        _ if series.reason.is_empty() => "no match".into(),
        _ => format!("no match ({})", series.reason),
    }
}

pub fn print_summary(
    w: &mut dyn Write,
    stats: &RunStats,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let headline = if stats.cancelled {
        format!("Cancelled after {} rows", stats.total)
    } else {
        format!("Parsed {} rows", stats.total)
    };
    if color.enabled() {
        writeln!(w, "{}", headline.bold())?;
    } else {
        writeln!(w, "{headline}")?;
    }
    writeln!(
        w,
        "  extracted: {}, cached: {}, skipped: {}, failed: {}",
        stats.extracted, stats.cached, stats.skipped, stats.failed
    )?;
    if stats.failed > 0 {
        let msg = format!("{} rows fell back after generator errors", stats.failed);
        if color.enabled() {
            writeln!(w, "  {}", msg.red())?;
        } else {
            writeln!(w, "  {msg}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmeta_core::decompose;

    fn record() -> ParsedRecord {
        let range = decompose("2016-06 / 2016-06");
        ParsedRecord {
            pid: 5,
            name_seq: 0,
            raw_conference: Some("raw".into()),
            conf_name: "Fifth Workshop".into(),
            conf_place: "Austin, TX, USA".into(),
            conf_dates: "2016-06 / 2016-06".into(),
            start: range.start,
            end: range.end,
            conf_order: Some(5),
            series: SeriesMatch::disabled(),
            note: String::new(),
        }
    }

    fn render(events: &[ProgressEvent]) -> String {
        let mut printer = RowPrinter::new(ColorMode(false));
        let mut buf = Vec::new();
        for ev in events {
            printer.print(&mut buf, ev).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn plain_row_report() {
        let out = render(&[
            ProgressEvent::Row {
                index: 1,
                total: 2,
                pid: 5,
                name_seq: 0,
                raw: Some("raw".into()),
            },
            ProgressEvent::Parsed {
                index: 1,
                total: 2,
                outcome: confmeta_core::RowOutcome::Extracted,
                record: Box::new(record()),
            },
        ]);
        assert_eq!(
            out,
            "\n=== 1/2 PID 5 name_seq 0 ===\nRAW: raw\n\
             PARSED: name='Fifth Workshop' | place='Austin, TX, USA' | dates='2016-06 / 2016-06' | \
             start='None' | end='None' | order=5\n\
             DBLP: lookup disabled\n"
        );
    }

    #[test]
    fn streamed_chunks_are_closed_before_record() {
        let out = render(&[
            ProgressEvent::StreamChunk { text: "{\"a\"".into() },
            ProgressEvent::StreamChunk { text: ": 1}".into() },
            ProgressEvent::Parsed {
                index: 1,
                total: 1,
                outcome: confmeta_core::RowOutcome::Extracted,
                record: Box::new(record()),
            },
        ]);
        assert!(out.starts_with("LLM output (streaming):\n{\"a\": 1}\n\nPARSED:"));
    }

    #[test]
    fn series_descriptions() {
        assert_eq!(describe_series(&SeriesMatch::disabled()), "lookup disabled");
        assert_eq!(
            describe_series(&SeriesMatch::unmatched("no dblp candidates")),
            "no match (no dblp candidates)"
        );
        let matched = SeriesMatch {
            slug: Some("hri".into()),
            stream_iri: Some("https://dblp.org/streams/conf/hri".into()),
            name: Some("HRI".into()),
            reason: String::new(),
        };
        assert_eq!(describe_series(&matched), "hri (HRI)");
    }
}
