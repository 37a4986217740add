//! Memo of extraction results keyed by the exact raw listing.
//!
//! **L1** – [`DashMap`] of per-key [`OnceCell`]s. Concurrent lookups of the
//! same raw string share one cell, so the extraction behind it runs at most
//! once. A failed extraction leaves the cell empty and the next caller retries.
//! **L2** – Optional SQLite table on disk so results survive restarts.
//!
//! Only completed extractions are stored, decoder fallbacks included.
//! Transport failures never reach the cache.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::OnceCell;

use crate::{CoreError, ExtractionResult};

/// Outcome of [`ExtractionCache::get_or_try_extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub result: ExtractionResult,
    /// `true` when no extraction ran for this call.
    pub cached: bool,
}

struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             CREATE TABLE IF NOT EXISTS extraction_cache (
                 raw          TEXT PRIMARY KEY,
                 conf_name    TEXT NOT NULL,
                 conf_place   TEXT NOT NULL,
                 conf_dates   TEXT NOT NULL,
                 note         TEXT NOT NULL,
                 inserted_at  INTEGER NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    fn get(&self, raw: &str) -> Result<Option<ExtractionResult>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT conf_name, conf_place, conf_dates, note FROM extraction_cache WHERE raw = ?1",
                [raw],
                |row| {
                    Ok(ExtractionResult {
                        name: row.get(0)?,
                        place: row.get(1)?,
                        dates: row.get(2)?,
                        note: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    fn insert(&self, raw: &str, result: &ExtractionResult) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO extraction_cache
                 (raw, conf_name, conf_place, conf_dates, note, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                raw,
                result.name,
                result.place,
                result.dates,
                result.note,
                now_epoch()
            ],
        )?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.conn
            .query_row("SELECT COUNT(*) FROM extraction_cache", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    fn clear(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM extraction_cache", [])?;
        Ok(())
    }
}

fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Process-lifetime extraction memo with optional on-disk persistence.
pub struct ExtractionCache {
    entries: DashMap<String, Arc<OnceCell<ExtractionResult>>>,
    store: Option<Mutex<SqliteStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionCache {
    /// In-memory cache only.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            store: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache backed by a SQLite file at `path` (created if missing).
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::CacheDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let store = SqliteStore::open(path)?;
        Ok(Self {
            store: Some(Mutex::new(store)),
            ..Self::new()
        })
    }

    fn cell(&self, raw: &str) -> Arc<OnceCell<ExtractionResult>> {
        self.entries
            .entry(raw.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn load_persisted(&self, raw: &str) -> Option<ExtractionResult> {
        let store = self.store.as_ref()?.lock().ok()?;
        match store.get(raw) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "extraction cache read failed");
                None
            }
        }
    }

    fn persist(&self, raw: &str, result: &ExtractionResult) {
        if let Some(store) = &self.store
            && let Ok(store) = store.lock()
            && let Err(e) = store.insert(raw, result)
        {
            tracing::warn!(error = %e, "extraction cache write failed");
        }
    }

    /// Stored result for `raw`, if any (L1 then L2).
    pub fn get(&self, raw: &str) -> Option<ExtractionResult> {
        if let Some(cell) = self.entries.get(raw)
            && let Some(result) = cell.get()
        {
            return Some(result.clone());
        }
        let found = self.load_persisted(raw)?;
        let _ = self.cell(raw).set(found.clone());
        Some(found)
    }

    /// Store `result` for `raw` unless a result is already present.
    pub fn insert(&self, raw: &str, result: ExtractionResult) {
        if self.cell(raw).set(result.clone()).is_ok() {
            self.persist(raw, &result);
        }
    }

    /// Return the stored result for `raw`, or run `extract` to produce it.
    ///
    /// Concurrent callers for the same `raw` wait on a single run of
    /// `extract`. When `extract` fails nothing is stored and the error is
    /// returned to the caller that ran it; waiting callers then retry.
    pub async fn get_or_try_extract<F, Fut, E>(&self, raw: &str, extract: F) -> Result<Lookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractionResult, E>>,
    {
        let cell = self.cell(raw);
        if let Some(result) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Lookup {
                result: result.clone(),
                cached: true,
            });
        }

        let mut ran = false;
        let result = cell
            .get_or_try_init(|| async {
                if let Some(found) = self.load_persisted(raw) {
                    return Ok(found);
                }
                ran = true;
                let fresh = extract().await;
                if let Ok(result) = &fresh {
                    self.persist(raw, result);
                }
                fresh
            })
            .await?
            .clone();

        if ran {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Lookup {
            result,
            cached: !ran,
        })
    }

    /// Number of distinct raw strings with a stored result in memory.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in the on-disk table (0 without persistence).
    pub fn disk_len(&self) -> usize {
        self.store
            .as_ref()
            .and_then(|s| s.lock().ok().map(|s| s.len()))
            .unwrap_or(0)
    }

    pub fn has_persistence(&self) -> bool {
        self.store.is_some()
    }

    /// Drop every entry from both tiers.
    pub fn clear(&self) {
        self.entries.clear();
        if let Some(store) = &self.store
            && let Ok(store) = store.lock()
            && let Err(e) = store.clear()
        {
            tracing::warn!(error = %e, "extraction cache clear failed");
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ExtractionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionCache")
            .field("entries", &self.len())
            .field("persistent", &self.has_persistence())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
