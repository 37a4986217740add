//! Candidate lookup for conference-series matching.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};

use crate::{DblpError, SeriesCandidate};

/// Last all-caps token of length >= 3, e.g. `HRI` in
/// "20th Annual ACM/IEEE International Conference on Human-Robot Interaction, HRI 2025".
pub fn series_acronym(conf_name: &str) -> Option<&str> {
    static ACRONYM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{3,}\b").unwrap());
    ACRONYM_RE.find_iter(conf_name).last().map(|m| m.as_str())
}

/// First six whitespace-separated words, used when no acronym is present.
fn name_prefix(conf_name: &str) -> String {
    conf_name
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn normalize_for_score(s: &str) -> String {
    static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
    NON_ALNUM.replace_all(&s.to_lowercase(), " ").trim().to_string()
}

fn candidate_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SeriesCandidate> {
    Ok(SeriesCandidate {
        slug: row.get(0)?,
        stream_iri: row.get(1)?,
        name: row.get(2)?,
    })
}

/// Find up to `limit` candidate series for a normalized conference name, most
/// similar first.
pub fn find_candidates(
    conn: &Connection,
    conf_name: &str,
    limit: usize,
) -> Result<Vec<SeriesCandidate>, DblpError> {
    if conf_name.trim().is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut candidates: Vec<SeriesCandidate> = if let Some(acronym) = series_acronym(conf_name) {
        let mut stmt = conn.prepare_cached(
            "SELECT series_slug, stream_iri, series_name FROM conference_series \
             WHERE lower(series_slug) = lower(?1) OR series_name LIKE ?2 ESCAPE '\\' \
             LIMIT ?3",
        )?;
        stmt.query_map(params![acronym, like_pattern(acronym), limit as i64], candidate_from_row)?
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let mut stmt = conn.prepare_cached(
            "SELECT series_slug, stream_iri, series_name FROM conference_series \
             WHERE series_name LIKE ?1 ESCAPE '\\' LIMIT ?2",
        )?;
        stmt.query_map(
            params![like_pattern(&name_prefix(conf_name)), limit as i64],
            candidate_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?
    };

    let target = normalize_for_score(conf_name);
    let mut scored: Vec<(f64, SeriesCandidate)> = candidates
        .drain(..)
        .map(|c| {
            let score = rapidfuzz::fuzz::ratio(target.chars(), normalize_for_score(&c.name).chars());
            (score, c)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    tracing::debug!(conf_name, candidates = scored.len(), "series candidates");
    Ok(scored.into_iter().map(|(_, c)| c).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SeriesBatch, init_database, insert_batch};

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        let mut batch = SeriesBatch::new();
        for (slug, name) in [
            ("hri", "ACM/IEEE International Conference on Human-Robot Interaction (HRI)"),
            ("uist", "ACM Symposium on User Interface Software and Technology (UIST)"),
            ("chi", "Conference on Human Factors in Computing Systems (CHI)"),
            ("ecai", "European Conference on Artificial Intelligence (ECAI)"),
        ] {
            batch.rows.push((
                format!("https://dblp.org/streams/conf/{slug}"),
                slug.to_string(),
                name.to_string(),
            ));
        }
        insert_batch(&conn, &batch).unwrap();
        conn
    }

    #[test]
    fn acronym_is_last_caps_token() {
        assert_eq!(
            series_acronym("20th Annual ACM/IEEE Conference on Human-Robot Interaction, HRI 2025"),
            Some("HRI")
        );
        assert_eq!(series_acronym("Workshop on Things"), None);
        // Two-letter acronyms are too ambiguous.
        assert_eq!(series_acronym("Conference XY"), None);
    }

    #[test]
    fn finds_by_acronym_slug() {
        let conn = setup_db();
        let found = find_candidates(
            &conn,
            "20th Annual ACM/IEEE International Conference on Human-Robot Interaction, HRI 2025",
            10,
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "hri");
        assert_eq!(found[0].stream_iri, "https://dblp.org/streams/conf/hri");
    }

    #[test]
    fn finds_by_name_prefix_without_acronym() {
        let conn = setup_db();
        let found = find_candidates(&conn, "European Conference on Artificial Intelligence", 10)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "ecai");
    }

    #[test]
    fn empty_name_has_no_candidates() {
        let conn = setup_db();
        assert!(find_candidates(&conn, "  ", 10).unwrap().is_empty());
    }

    #[test]
    fn unreadable_rows_are_errors() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE conference_series (stream_iri, series_slug, series_name);
             INSERT INTO conference_series VALUES
                 ('https://dblp.org/streams/conf/hri', 'hri', X'00FF');",
        )
        .unwrap();
        assert!(matches!(
            find_candidates(&conn, "Conference on Human-Robot Interaction, HRI", 10),
            Err(DblpError::Database(_))
        ));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
