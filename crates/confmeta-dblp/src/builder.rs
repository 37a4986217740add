//! Build the conference-series index from a dblp N-Triples dump (`dblp.nt.gz`).
//!
//! The dump is streamed twice: the first pass collects every subject typed as a
//! dblp `Conference`, the second pass picks up the `rdfs:label` of those subjects.
//! Both passes decode gzip on the fly so the multi-gigabyte dump never hits disk
//! uncompressed.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use rusqlite::Connection;

use crate::db::{self, SeriesBatch};
use crate::parser::{self, Object};
use crate::{BuildProgress, DblpError};

const BATCH_SIZE: usize = 10_000;

/// Report progress every this many lines.
const PROGRESS_EVERY: u64 = 1_000_000;

pub fn build_from_file(
    db_path: &Path,
    nt_gz_path: &Path,
    mut progress: impl FnMut(BuildProgress),
) -> Result<u64, DblpError> {
    let conn = Connection::open(db_path)?;
    db::init_database(&conn)?;

    let series = collect_conference_subjects(nt_gz_path, &mut progress)?;
    tracing::info!(series = series.len(), "collected conference series subjects");

    db::clear_series(&conn)?;
    insert_labels(&conn, nt_gz_path, &series, &mut progress)?;

    let count = db::series_count(&conn)?;
    db::set_metadata(&conn, "last_updated", &now_unix_timestamp())?;
    db::set_metadata(&conn, "series_count", &count.to_string())?;

    progress(BuildProgress::Complete {
        series: count as u64,
    });
    Ok(count as u64)
}

/// Line reader over the decompressed dump. Invalid UTF-8 is replaced
/// rather than aborting the build.
struct DumpLines {
    reader: BufReader<MultiGzDecoder<File>>,
    buf: Vec<u8>,
}

impl DumpLines {
    fn open(path: &Path) -> Result<Self, DblpError> {
        let file = File::open(path)?;
        let decoder = MultiGzDecoder::new(file);
        Ok(Self {
            reader: BufReader::with_capacity(1024 * 1024, decoder),
            buf: Vec::new(),
        })
    }

    fn next_line(&mut self) -> Result<Option<String>, DblpError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Pass 1: every subject with `rdf:type dblp:Conference`.
fn collect_conference_subjects(
    path: &Path,
    progress: &mut impl FnMut(BuildProgress),
) -> Result<HashSet<String>, DblpError> {
    let mut subjects = HashSet::new();
    let mut lines_read: u64 = 0;

    let mut lines = DumpLines::open(path)?;
    while let Some(line) = lines.next_line()? {
        lines_read += 1;

        if parser::mentions_conference_type(&line)
            && let Some(triple) = parser::parse_line(&line)
            && triple.predicate == parser::RDF_TYPE
            && triple.object == Object::Iri(parser::DBLP_CONFERENCE.to_string())
        {
            subjects.insert(triple.subject.to_string());
        }

        if lines_read % PROGRESS_EVERY == 0 {
            progress(BuildProgress::ScanningTypes {
                lines_read,
                series_found: subjects.len() as u64,
            });
        }
    }

    progress(BuildProgress::ScanningTypes {
        lines_read,
        series_found: subjects.len() as u64,
    });
    Ok(subjects)
}

/// Pass 2: labels of the subjects found in pass 1.
fn insert_labels(
    conn: &Connection,
    path: &Path,
    series: &HashSet<String>,
    progress: &mut impl FnMut(BuildProgress),
) -> Result<(), DblpError> {
    let mut batch = SeriesBatch::new();
    let mut lines_read: u64 = 0;
    let mut labels_written: u64 = 0;

    let mut lines = DumpLines::open(path)?;
    while let Some(line) = lines.next_line()? {
        lines_read += 1;

        if line.contains(parser::RDFS_LABEL)
            && let Some(triple) = parser::parse_line(&line)
            && triple.predicate == parser::RDFS_LABEL
            && series.contains(triple.subject)
            && let Object::Literal(label) = triple.object
        {
            let slug = parser::iri_to_slug(triple.subject).to_string();
            batch.rows.push((triple.subject.to_string(), slug, label));
        }

        if batch.len() >= BATCH_SIZE {
            db::insert_batch(conn, &batch)?;
            labels_written += batch.len() as u64;
            batch.clear();
        }

        if lines_read % PROGRESS_EVERY == 0 {
            progress(BuildProgress::Labeling {
                lines_read,
                labels_written,
            });
        }
    }

    if !batch.is_empty() {
        db::insert_batch(conn, &batch)?;
        labels_written += batch.len() as u64;
    }

    progress(BuildProgress::Labeling {
        lines_read,
        labels_written,
    });
    Ok(())
}

fn now_unix_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}
