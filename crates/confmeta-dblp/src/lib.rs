//! Offline dblp conference-series index.
//!
//! Builds a small SQLite table of dblp conference *streams* (series) from the
//! dblp N-Triples dump and answers candidate lookups used to attach a parsed
//! conference instance to its series.

mod builder;
mod db;
pub mod parser;
mod query;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

pub use query::series_acronym;

#[derive(Error, Debug)]
pub enum DblpError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("series index not initialized at {0}")]
    NotInitialized(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A dblp conference series row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesCandidate {
    pub slug: String,
    pub stream_iri: String,
    pub name: String,
}

/// Progress events emitted while building the index.
#[derive(Debug, Clone)]
pub enum BuildProgress {
    ScanningTypes { lines_read: u64, series_found: u64 },
    Labeling { lines_read: u64, labels_written: u64 },
    Complete { series: u64 },
}

/// Handle to an opened series index.
pub struct SeriesIndex {
    conn: Connection,
    path: PathBuf,
}

impl SeriesIndex {
    /// Open an existing index, verifying the series table exists.
    pub fn open(path: &Path) -> Result<Self, DblpError> {
        let conn = Connection::open(path)?;
        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='conference_series'",
            [],
            |row| row.get(0),
        )?;
        if !table_exists {
            return Err(DblpError::NotInitialized(path.to_path_buf()));
        }
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Candidate series for a normalized conference name, best first.
    pub fn candidates(
        &self,
        conf_name: &str,
        limit: usize,
    ) -> Result<Vec<SeriesCandidate>, DblpError> {
        query::find_candidates(&self.conn, conf_name, limit)
    }

    pub fn series_count(&self) -> Result<i64, DblpError> {
        db::series_count(&self.conn)
    }

    /// Unix timestamp (seconds) of the last build, if recorded.
    pub fn build_date(&self) -> Result<Option<String>, DblpError> {
        db::get_metadata(&self.conn, "last_updated")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build (or rebuild) the series index at `db_path` from a local `dblp.nt.gz`.
/// Returns the number of series stored.
pub fn build_index_from_file(
    db_path: &Path,
    nt_gz_path: &Path,
    progress: impl FnMut(BuildProgress),
) -> Result<u64, DblpError> {
    builder::build_from_file(db_path, nt_gz_path, progress)
}
