//! SQLite-backed response cache

use super::store::{CacheEntry, CacheStats, ResponseCache};
use crate::error::{DocQueryError, Result};
use crate::query::{QueryFingerprint, ResponsePayload};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- LLM response cache keyed by request fingerprint
CREATE TABLE IF NOT EXISTS response_cache (
    fingerprint TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    model_used TEXT NOT NULL,
    token_cost INTEGER NOT NULL,
    degraded INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_response_cache_created ON response_cache(created_at);
"#;

/// Persistent cache handle. The connection sits behind a mutex so one handle can
/// be shared by concurrent runs; each operation is a single short statement.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open database at path, creating it and its schema if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("cache.sqlite")
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(CREATE_TABLES)?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let conn = self.lock()?;
        let version = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    /// Vacuum the database
    pub fn vacuum(&self) -> Result<()> {
        self.lock()?.execute("VACUUM", [])?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DocQueryError::Cache("cache connection lock poisoned".to_string()))
    }
}

// Fixed-width UTC timestamps compare lexicographically in chronological order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DocQueryError::Cache(format!("invalid timestamp '{}': {}", raw, e)))
}

impl ResponseCache for SqliteCacheStore {
    fn get(&self, fingerprint: &QueryFingerprint) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT payload, model_used, token_cost, degraded, created_at
                 FROM response_cache WHERE fingerprint = ?1",
                params![fingerprint.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((payload, model_used, token_cost, degraded, created_at)) = row else {
            return Ok(None);
        };

        let response_payload: ResponsePayload = serde_json::from_str(&payload)?;
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            response_payload,
            created_at: parse_timestamp(&created_at)?,
            model_used,
            token_cost: token_cost.max(0) as usize,
            degraded,
        }))
    }

    fn put(&self, entry: &CacheEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.response_payload)?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO response_cache
             (fingerprint, payload, model_used, token_cost, degraded, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.fingerprint.as_str(),
                payload,
                entry.model_used,
                entry.token_cost as i64,
                entry.degraded,
                format_timestamp(entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn evict_older_than(&self, age: Duration) -> Result<usize> {
        let Ok(age) = chrono::Duration::from_std(age) else {
            return Ok(0);
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(age) else {
            return Ok(0);
        };
        let rows = self.lock()?.execute(
            "DELETE FROM response_cache WHERE created_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(rows)
    }

    fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;
        let (total, degraded, cost, oldest, newest) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(degraded), 0), COALESCE(SUM(token_cost), 0),
                    MIN(created_at), MAX(created_at)
             FROM response_cache",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )?;
        drop(conn);

        Ok(CacheStats {
            total_entries: total as usize,
            degraded_entries: degraded as usize,
            total_token_cost: cost.max(0) as usize,
            oldest: oldest.as_deref().map(parse_timestamp).transpose()?,
            newest: newest.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn clear(&self) -> Result<usize> {
        let rows = self.lock()?.execute("DELETE FROM response_cache", [])?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Analysis;
    use tempfile::TempDir;

    fn entry(key: &str, payload: ResponsePayload) -> CacheEntry {
        CacheEntry::new(QueryFingerprint::from_hex(key), payload, "llama", 42, false)
    }

    #[test]
    fn test_put_get_roundtrip_preserves_fields() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let analysis = Analysis {
            key_clauses: vec!["Confidentiality".into()],
            compliance_issues: vec![],
        };
        let mut e = entry("abc", ResponsePayload::StructuredAnalysis(analysis));
        e.degraded = true;
        store.put(&e).unwrap();

        let got = store.get(&QueryFingerprint::from_hex("abc")).unwrap().unwrap();
        assert_eq!(got.response_payload, e.response_payload);
        assert_eq!(got.model_used, "llama");
        assert_eq!(got.token_cost, 42);
        assert!(got.degraded);
        assert_eq!(
            format_timestamp(got.created_at),
            format_timestamp(e.created_at)
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        assert!(store.get(&QueryFingerprint::from_hex("nope")).unwrap().is_none());
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        let e = entry("k", ResponsePayload::PlainText("same".into()));
        store.put(&e).unwrap();
        store.put(&e).unwrap();
        assert_eq!(store.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_evict_older_than() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        assert_eq!(store.evict_older_than(Duration::from_secs(10)).unwrap(), 0);

        let mut old = entry("old", ResponsePayload::PlainText("a".into()));
        old.created_at = Utc::now() - chrono::Duration::days(2);
        store.put(&old).unwrap();
        store
            .put(&entry("new", ResponsePayload::PlainText("b".into())))
            .unwrap();

        assert_eq!(store.evict_older_than(Duration::from_secs(86_400)).unwrap(), 1);
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_token_cost, 42);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache").join("cache.sqlite");

        {
            let store = SqliteCacheStore::open(&path).unwrap();
            store
                .put(&entry("persist", ResponsePayload::PlainText("kept".into())))
                .unwrap();
        }

        let store = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
        let got = store.get(&QueryFingerprint::from_hex("persist")).unwrap();
        assert!(got.is_some());
        assert_eq!(store.clear().unwrap(), 1);
    }
}
