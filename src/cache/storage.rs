//! Cache snapshot store trait and SQLite implementation.
//!
//! The store is a write-through snapshot of the in-memory slot map, not
//! a second writer: it is only read once, at startup, to rehydrate the
//! cache from the previous run.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// One slot as persisted to the snapshot store.
#[derive(Debug, Clone)]
pub struct PersistedSlot {
  /// Cache slot identifier (the query key hash)
  pub hash: String,
  /// Resource kind the slot belongs to
  pub kind: String,
  /// Human-readable query description
  pub description: String,
  /// The cached value
  pub value: Value,
  /// When the value was fetched from the network
  pub fetched_at: DateTime<Utc>,
}

/// Trait for cache snapshot backends.
pub trait CacheStore: Send + Sync + 'static {
  /// Write one slot (insert or replace).
  fn persist(&self, slot: &PersistedSlot) -> Result<()>;

  /// Remove one slot.
  fn remove(&self, hash: &str) -> Result<()>;

  /// Load every persisted slot. Called once at startup.
  fn load_all(&self) -> Result<Vec<PersistedSlot>>;

  /// Drop the entire snapshot.
  fn clear(&self) -> Result<()>;
}

impl CacheStore for Box<dyn CacheStore> {
  fn persist(&self, slot: &PersistedSlot) -> Result<()> {
    (**self).persist(slot)
  }

  fn remove(&self, hash: &str) -> Result<()> {
    (**self).remove(hash)
  }

  fn load_all(&self) -> Result<Vec<PersistedSlot>> {
    (**self).load_all()
  }

  fn clear(&self) -> Result<()> {
    (**self).clear()
  }
}

/// Store used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn persist(&self, _slot: &PersistedSlot) -> Result<()> {
    Ok(())
  }

  fn remove(&self, _hash: &str) -> Result<()> {
    Ok(())
  }

  fn load_all(&self) -> Result<Vec<PersistedSlot>> {
    Ok(Vec::new())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// SQLite-backed snapshot store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      Error::Storage(format!("failed to open cache database at {}: {}", path.display(), e))
    })?;

    Self::from_connection(conn)
  }

  /// Open a store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path).map_err(|e| {
      Error::Storage(format!("failed to open cache database at {}: {}", path.display(), e))
    })?;
    Self::from_connection(conn)
  }

  /// In-memory store, used by tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::Storage(format!("failed to open in-memory database: {}", e)))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Storage("could not determine data directory".to_string()))?;

    Ok(data_dir.join("opsdesk").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(SNAPSHOT_SCHEMA)
      .map_err(|e| Error::Storage(format!("failed to run cache migrations: {}", e)))?;

    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
  }
}

/// Schema for the snapshot table.
const SNAPSHOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_snapshot (
    query_hash TEXT PRIMARY KEY,
    resource_kind TEXT NOT NULL,
    description TEXT NOT NULL,
    data BLOB NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_snapshot_kind
    ON query_snapshot(resource_kind);
"#;

impl CacheStore for SqliteStore {
  fn persist(&self, slot: &PersistedSlot) -> Result<()> {
    let conn = self.lock()?;

    let data = serde_json::to_vec(&slot.value)
      .map_err(|e| Error::Storage(format!("failed to serialize slot: {}", e)))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_snapshot (query_hash, resource_kind, description, data, fetched_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
          slot.hash,
          slot.kind,
          slot.description,
          data,
          slot.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string()
        ],
      )
      .map_err(|e| Error::Storage(format!("failed to persist slot: {}", e)))?;

    Ok(())
  }

  fn remove(&self, hash: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM query_snapshot WHERE query_hash = ?", params![hash])
      .map_err(|e| Error::Storage(format!("failed to remove slot: {}", e)))?;

    Ok(())
  }

  fn load_all(&self) -> Result<Vec<PersistedSlot>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT query_hash, resource_kind, description, data, fetched_at FROM query_snapshot")
      .map_err(|e| Error::Storage(format!("failed to prepare snapshot query: {}", e)))?;

    let rows = stmt
      .query_map([], |row| {
        let hash: String = row.get(0)?;
        let kind: String = row.get(1)?;
        let description: String = row.get(2)?;
        let data: Vec<u8> = row.get(3)?;
        let fetched_at: String = row.get(4)?;
        Ok((hash, kind, description, data, fetched_at))
      })
      .map_err(|e| Error::Storage(format!("failed to load snapshot: {}", e)))?;

    let mut slots = Vec::new();
    for row in rows.filter_map(|r| r.ok()) {
      let (hash, kind, description, data, fetched_at_str) = row;

      // A corrupt row is dropped rather than failing the whole rehydrate.
      let value: Value = match serde_json::from_slice(&data) {
        Ok(v) => v,
        Err(_) => continue,
      };
      let fetched_at = match parse_datetime(&fetched_at_str) {
        Ok(t) => t,
        Err(_) => continue,
      };

      slots.push(PersistedSlot {
        hash,
        kind,
        description,
        value,
        fetched_at,
      });
    }

    Ok(slots)
  }

  fn clear(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM query_snapshot", [])
      .map_err(|e| Error::Storage(format!("failed to clear snapshot: {}", e)))?;

    Ok(())
  }
}

/// Parse a datetime string in the stored "YYYY-MM-DD HH:MM:SS" format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| Error::Storage(format!("failed to parse datetime '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn slot(hash: &str, kind: &str, value: Value) -> PersistedSlot {
    PersistedSlot {
      hash: hash.to_string(),
      kind: kind.to_string(),
      description: format!("{} test", kind),
      value,
      fetched_at: Utc::now(),
    }
  }

  #[test]
  fn test_persist_then_load_roundtrip() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.persist(&slot("h1", "customers", json!({"items": [1, 2, 3]}))).unwrap();
    store.persist(&slot("h2", "services", json!("hello"))).unwrap();

    let mut loaded = store.load_all().unwrap();
    loaded.sort_by(|a, b| a.hash.cmp(&b.hash));

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].hash, "h1");
    assert_eq!(loaded[0].kind, "customers");
    assert_eq!(loaded[0].value, json!({"items": [1, 2, 3]}));
    assert_eq!(loaded[1].value, json!("hello"));
  }

  #[test]
  fn test_persist_replaces_existing_slot() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.persist(&slot("h1", "customers", json!(1))).unwrap();
    store.persist(&slot("h1", "customers", json!(2))).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].value, json!(2));
  }

  #[test]
  fn test_remove_and_clear() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.persist(&slot("h1", "customers", json!(1))).unwrap();
    store.persist(&slot("h2", "customers", json!(2))).unwrap();

    store.remove("h1").unwrap();
    assert_eq!(store.load_all().unwrap().len(), 1);

    store.clear().unwrap();
    assert!(store.load_all().unwrap().is_empty());
  }

  #[test]
  fn test_datetime_roundtrip_truncates_to_seconds() {
    let store = SqliteStore::open_in_memory().unwrap();
    let original = slot("h1", "content", json!(null));
    store.persist(&original).unwrap();

    let loaded = store.load_all().unwrap();
    let diff = original.fetched_at - loaded[0].fetched_at;
    assert!(diff.num_seconds().abs() <= 1);
  }
}
