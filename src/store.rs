//! SQLite-backed `package_scores` table shared by every pipeline task.

use crate::error::{PkgScoreError, Result};
use crate::types::record::{MetricTable, PackageRecord, SignalTable};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS package_scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        signals TEXT,
        metrics TEXT
    );
";

pub struct Store {
    conn: Mutex<Option<Connection>>,
}

impl Store {
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    /// Opens (or creates) a database file. Rows left by a previous run are
    /// discarded so every run starts from an empty table.
    pub fn open(path: &Path) -> Result<Self> {
        Self::initialize(Connection::open(path)?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(
            "DELETE FROM package_scores;
             DELETE FROM sqlite_sequence WHERE name = 'package_scores';",
        )?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(PkgScoreError::StoreClosed)?;
        f(conn)
    }

    /// Returns the record id for `url` and whether this call created it.
    pub fn ingest(&self, url: &str) -> Result<(i64, bool)> {
        self.with_conn(|conn| {
            let created = conn.execute(
                "INSERT OR IGNORE INTO package_scores (url) VALUES (?1)",
                params![url],
            )? == 1;
            let id: i64 = conn.query_row(
                "SELECT id FROM package_scores WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )?;
            debug!(id, url, created, "ingested package");
            Ok((id, created))
        })
    }

    pub fn read_record(&self, id: i64) -> Result<PackageRecord> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, url, signals, metrics FROM package_scores WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                        ))
                    },
                )
                .optional()?;
            let (id, url, signals, metrics) = row.ok_or(PkgScoreError::RecordNotFound(id))?;
            Ok(PackageRecord {
                id,
                url,
                signals: signals.as_deref().map(SignalTable::from_json).transpose()?,
                metrics: metrics.as_deref().map(MetricTable::from_json).transpose()?,
            })
        })
    }

    pub fn write_signals(&self, url: &str, signals: &SignalTable) -> Result<()> {
        self.write_once(url, "signals", &signals.to_json()?)
    }

    pub fn write_metrics(&self, url: &str, metrics: &MetricTable) -> Result<()> {
        self.write_once(url, "metrics", &metrics.to_json()?)
    }

    fn write_once(&self, url: &str, column: &'static str, json: &str) -> Result<()> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE package_scores SET {column} = ?1 WHERE url = ?2 AND {column} IS NULL"
            );
            if conn.execute(&sql, params![json, url])? == 1 {
                return Ok(());
            }
            let exists = conn
                .query_row(
                    "SELECT 1 FROM package_scores WHERE url = ?1",
                    params![url],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                Err(PkgScoreError::AlreadyWritten {
                    url: url.to_string(),
                    column,
                })
            } else {
                Err(PkgScoreError::UnknownPackage(url.to_string()))
            }
        })
    }

    #[cfg(test)]
    pub fn record_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM package_scores", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Drops the connection. Later operations fail with `StoreClosed`;
    /// closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let taken = self.lock().take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| PkgScoreError::Sqlite(e))?;
            debug!("storage closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{metric, signal};
    use tempfile::TempDir;

    #[test]
    fn ingest_assigns_ids_and_collapses_duplicates() {
        let store = Store::open_in_memory().expect("store should open");
        let (first, created) = store.ingest("https://github.com/a/b").expect("ingest");
        assert!(created);
        let (second, _) = store.ingest("https://github.com/c/d").expect("ingest");
        assert_ne!(first, second);

        let (again, created) = store.ingest("https://github.com/a/b").expect("ingest");
        assert_eq!(again, first);
        assert!(!created);
        assert_eq!(store.record_count().expect("count"), 2);
    }

    #[test]
    fn fresh_record_has_no_tables() {
        let store = Store::open_in_memory().expect("store should open");
        let (id, _) = store.ingest("https://github.com/a/b").expect("ingest");
        let record = store.read_record(id).expect("record should exist");
        assert_eq!(record.url, "https://github.com/a/b");
        assert!(record.signals.is_none());
        assert!(record.metrics.is_none());
    }

    #[test]
    fn signals_and_metrics_are_write_once() {
        let store = Store::open_in_memory().expect("store should open");
        let url = "https://github.com/a/b";
        let (id, _) = store.ingest(url).expect("ingest");

        let signals = SignalTable::from([(signal::TOP3, 10.0), (signal::COMMITS_YR, 100.0)]);
        store.write_signals(url, &signals).expect("first write");
        let err = store
            .write_signals(url, &signals)
            .expect_err("second write should fail");
        assert!(matches!(err, PkgScoreError::AlreadyWritten { column: "signals", .. }));

        let mut metrics = MetricTable::new();
        metrics.record(metric::BUS_FACTOR, 0.9, 0.001);
        store.write_metrics(url, &metrics).expect("metrics write");

        let record = store.read_record(id).expect("record should exist");
        assert_eq!(record.signals, Some(signals));
        assert_eq!(record.metrics, Some(metrics));
    }

    #[test]
    fn unknown_url_and_id_are_errors() {
        let store = Store::open_in_memory().expect("store should open");
        assert!(matches!(
            store.write_signals("https://github.com/x/y", &SignalTable::new()),
            Err(PkgScoreError::UnknownPackage(_))
        ));
        assert!(matches!(store.read_record(42), Err(PkgScoreError::RecordNotFound(42))));
    }

    #[test]
    fn closed_store_rejects_every_operation() {
        let store = Store::open_in_memory().expect("store should open");
        store.ingest("https://github.com/a/b").expect("ingest");
        store.close().expect("close should succeed");
        store.close().expect("second close is a no-op");

        assert!(store.is_closed());
        assert!(matches!(store.ingest("https://github.com/c/d"), Err(PkgScoreError::StoreClosed)));
        assert!(matches!(store.read_record(1), Err(PkgScoreError::StoreClosed)));
    }

    #[test]
    fn reopening_a_file_starts_empty() {
        let dir = TempDir::new().expect("temp dir should be created");
        let path = dir.path().join("scores.db");

        let store = Store::open(&path).expect("store should open");
        store.ingest("https://github.com/a/b").expect("ingest");
        store.close().expect("close");

        let reopened = Store::open(&path).expect("store should reopen");
        assert_eq!(reopened.record_count().expect("count"), 0);
        let (id, _) = reopened.ingest("https://github.com/c/d").expect("ingest");
        assert_eq!(id, 1);
    }
}
