//! Row source and sink for the batch run.
//!
//! Input rows are sampled from a listing table in a SQLite database; parsed
//! records replace an output table in the same database and can be exported
//! as CSV.

mod export;
mod table;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

pub use export::{csv_escape, export_csv, write_csv};
pub use table::{OUTPUT_COLUMNS, fetch_rows, write_parsed};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid table name {0:?}")]
    InvalidTable(String),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Open an existing database read-write. A missing file is an error rather
/// than a fresh empty database.
pub fn open(path: &Path) -> Result<Connection, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
    tracing::info!(path = %path.display(), "opened row store");
    Ok(conn)
}

/// Table names are interpolated into SQL, so only plain identifiers pass:
/// a letter or underscore followed by letters, digits or underscores.
pub fn validate_identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}
