//! SQLite storage for the conference-series index.

use rusqlite::{Connection, params};

use crate::DblpError;

/// Create the schema if missing. Sets WAL mode and NORMAL synchronous.
pub fn init_database(conn: &Connection) -> Result<(), DblpError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS conference_series (
            stream_iri TEXT PRIMARY KEY,
            series_slug TEXT NOT NULL,
            series_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_series_slug ON conference_series(series_slug COLLATE NOCASE);
        "#,
    )?;

    Ok(())
}

/// One `(stream_iri, slug, label)` row per conference series label.
#[derive(Debug, Default)]
pub struct SeriesBatch {
    pub rows: Vec<(String, String, String)>,
}

impl SeriesBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Upsert a batch of series rows in one transaction. A later label for the same
/// stream replaces the earlier one.
pub fn insert_batch(conn: &Connection, batch: &SeriesBatch) -> Result<(), DblpError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO conference_series (stream_iri, series_slug, series_name) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(stream_iri) DO UPDATE SET \
                series_slug = excluded.series_slug, series_name = excluded.series_name",
        )?;
        for (iri, slug, name) in &batch.rows {
            stmt.execute(params![iri, slug, name])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Remove all series rows (a rebuild replaces the index wholesale).
pub fn clear_series(conn: &Connection) -> Result<(), DblpError> {
    conn.execute("DELETE FROM conference_series", [])?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>, DblpError> {
    let mut stmt = conn.prepare_cached("SELECT value FROM metadata WHERE key = ?1")?;
    let value = stmt.query_row(params![key], |row| row.get(0)).ok();
    Ok(value)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), DblpError> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn series_count(conn: &Connection) -> Result<i64, DblpError> {
    let n = conn.query_row("SELECT COUNT(*) FROM conference_series", [], |row| row.get(0))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_count() {
        let conn = setup_db();
        let mut batch = SeriesBatch::new();
        batch.rows.push((
            "https://dblp.org/streams/conf/uist".into(),
            "uist".into(),
            "UIST".into(),
        ));
        batch.rows.push((
            "https://dblp.org/streams/conf/hri".into(),
            "hri".into(),
            "HRI".into(),
        ));
        insert_batch(&conn, &batch).unwrap();
        assert_eq!(series_count(&conn).unwrap(), 2);
    }

    #[test]
    fn upsert_replaces_label() {
        let conn = setup_db();
        let mut batch = SeriesBatch::new();
        batch
            .rows
            .push(("https://x/conf/a".into(), "a".into(), "Old".into()));
        insert_batch(&conn, &batch).unwrap();
        batch.clear();
        batch
            .rows
            .push(("https://x/conf/a".into(), "a".into(), "New".into()));
        insert_batch(&conn, &batch).unwrap();

        let name: String = conn
            .query_row(
                "SELECT series_name FROM conference_series WHERE stream_iri = ?1",
                params!["https://x/conf/a"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "New");
        assert_eq!(series_count(&conn).unwrap(), 1);
    }

    #[test]
    fn metadata_round_trip() {
        let conn = setup_db();
        assert_eq!(get_metadata(&conn, "series_count").unwrap(), None);
        set_metadata(&conn, "series_count", "3").unwrap();
        set_metadata(&conn, "series_count", "4").unwrap();
        assert_eq!(
            get_metadata(&conn, "series_count").unwrap(),
            Some("4".into())
        );
    }
}
