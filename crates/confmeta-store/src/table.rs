use confmeta_core::{ConferenceRow, ParsedRecord};
use rusqlite::{Connection, params};

use crate::{StoreError, validate_identifier};

/// Output table columns, in order. The CSV export uses the same header.
pub const OUTPUT_COLUMNS: [&str; 20] = [
    "pid",
    "name_seq",
    "raw_conference",
    "conf_name",
    "conf_place",
    "conf_dates",
    "conf_start_day",
    "conf_start_month",
    "conf_year_start",
    "conf_end_day",
    "conf_end_month",
    "conf_year_end",
    "conf_start_date",
    "conf_end_date",
    "conf_order",
    "conf_series_slug",
    "conf_series_stream_iri",
    "conf_series_name",
    "conf_series_match_reason",
    "note",
];

/// Random sample of up to `limit` rows with a non-null listing.
pub fn fetch_rows(
    conn: &Connection,
    table: &str,
    limit: usize,
) -> Result<Vec<ConferenceRow>, StoreError> {
    let table = validate_identifier(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT pid, name_seq, conference FROM {table} \
         WHERE conference IS NOT NULL ORDER BY RANDOM() LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(ConferenceRow {
                pid: row.get(0)?,
                name_seq: row.get(1)?,
                raw: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(table, rows = rows.len(), limit, "fetched input rows");
    Ok(rows)
}

/// Replace `table` with `records` in one transaction.
pub fn write_parsed(
    conn: &Connection,
    table: &str,
    records: &[ParsedRecord],
) -> Result<(), StoreError> {
    let table = validate_identifier(table)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             pid INTEGER,
             name_seq INTEGER,
             raw_conference TEXT,
             conf_name TEXT,
             conf_place TEXT,
             conf_dates TEXT,
             conf_start_day INTEGER,
             conf_start_month INTEGER,
             conf_year_start INTEGER,
             conf_end_day INTEGER,
             conf_end_month INTEGER,
             conf_year_end INTEGER,
             conf_start_date TEXT,
             conf_end_date TEXT,
             conf_order INTEGER,
             conf_series_slug TEXT,
             conf_series_stream_iri TEXT,
             conf_series_name TEXT,
             conf_series_match_reason TEXT,
             note TEXT
         );"
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ))?;
        for r in records {
            stmt.execute(params![
                r.pid,
                r.name_seq,
                r.raw_conference,
                r.conf_name,
                r.conf_place,
                r.conf_dates,
                r.start.day,
                r.start.month,
                r.start.year,
                r.end.day,
                r.end.month,
                r.end.year,
                r.start_date(),
                r.end_date(),
                r.conf_order,
                r.series.slug,
                r.series.stream_iri,
                r.series.name,
                r.series.reason,
                r.note,
            ])?;
        }
    }
    tx.commit()?;
    tracing::info!(table, rows = records.len(), "wrote parsed table");
    Ok(())
}
