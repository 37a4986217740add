use std::io::Write;
use std::path::Path;

use confmeta_core::ParsedRecord;

use crate::{OUTPUT_COLUMNS, StoreError};

/// Quote a CSV field when it contains a quote, comma or line break.
pub fn csv_escape(s: &str) -> String {
    if s.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn record_fields(r: &ParsedRecord) -> [String; 20] {
    [
        r.pid.to_string(),
        r.name_seq.to_string(),
        r.raw_conference.clone().unwrap_or_default(),
        r.conf_name.clone(),
        r.conf_place.clone(),
        r.conf_dates.clone(),
        opt(r.start.day),
        opt(r.start.month),
        opt(r.start.year),
        opt(r.end.day),
        opt(r.end.month),
        opt(r.end.year),
        opt(r.start_date()),
        opt(r.end_date()),
        opt(r.conf_order),
        opt(r.series.slug.as_deref()),
        opt(r.series.stream_iri.as_deref()),
        opt(r.series.name.as_deref()),
        r.series.reason.clone(),
        r.note.clone(),
    ]
}

/// Render records as CSV with a header row. Null values are empty fields.
pub fn export_csv(records: &[ParsedRecord]) -> String {
    let mut out = OUTPUT_COLUMNS.join(",");
    out.push('\n');
    for r in records {
        let fields: Vec<String> = record_fields(r).iter().map(|f| csv_escape(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub fn write_csv(path: &Path, records: &[ParsedRecord]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(write_err)?;
    file.write_all(export_csv(records).as_bytes())
        .map_err(write_err)?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote CSV");
    Ok(())
}
