use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::models::OddsValue;
use super::{OddsMap, OddsStore};
use crate::error::StoreError;

/// Odds store backed by a single SQLite table. Each save replaces every row
/// inside one transaction, so readers never see a partial artifact.
#[derive(Clone)]
pub struct SqliteOddsStore {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl SqliteOddsStore {
    /// Open (or create) the database at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteOddsStore {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable(format!("{} connection lock poisoned", self.path)))
    }

    fn decode(&self, raw: &str) -> Result<OddsValue, StoreError> {
        serde_json::from_str(raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

impl OddsStore for SqliteOddsStore {
    fn load(&self) -> Result<OddsMap, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT event_id, odds FROM odds_cache")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut odds = OddsMap::with_capacity(rows.len());
        for (event_id, raw) in rows {
            odds.insert(event_id, self.decode(&raw)?);
        }
        Ok(odds)
    }

    fn save(&self, odds: &OddsMap) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM odds_cache", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO odds_cache (event_id, odds) VALUES (?1, ?2)")?;
            for (event_id, value) in odds {
                let encoded = serde_json::to_string(value).map_err(|source| StoreError::Json {
                    path: self.path.clone(),
                    source,
                })?;
                insert.execute(params![event_id, encoded])?;
            }
        }
        tx.commit()?;
        debug!("Flushed {} odds rows to {}", odds.len(), self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS odds_cache (
    event_id    TEXT    PRIMARY KEY,
    odds        TEXT    NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> String {
        let dir = std::env::temp_dir().join("gameday_sync_sqlite_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
        path.display().to_string()
    }

    #[test]
    fn test_sqlite_store_starts_empty() {
        let store = SqliteOddsStore::open(&temp_db("empty.db")).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let path = temp_db("reopen.db");
        let mut odds = OddsMap::new();
        odds.insert("401671789".into(), OddsValue::Text("KC -3.5".into()));
        odds.insert("401671790".into(), OddsValue::Spread(1.5));

        {
            let store = SqliteOddsStore::open(&path).unwrap();
            store.save(&odds).unwrap();
        }

        let reopened = SqliteOddsStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), odds);
    }

    #[test]
    fn test_sqlite_store_save_replaces_all_rows() {
        let store = SqliteOddsStore::open(&temp_db("replace.db")).unwrap();
        let mut first = OddsMap::new();
        first.insert("a".into(), OddsValue::from("-1"));
        first.insert("b".into(), OddsValue::from("-2"));
        store.save(&first).unwrap();

        let mut second = OddsMap::new();
        second.insert("b".into(), OddsValue::from("-6.5"));
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), second);
    }
}
