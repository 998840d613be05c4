//! Persisted key/value store backing the fingerprint registries.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeSet;

use crate::db::Database;

/// Durable string map. Writes are persisted when the call returns.
pub trait FingerprintStore: Send + Sync {
  fn save(&self, key: &str, value: &str) -> Result<()>;

  fn get(&self, key: &str) -> Result<Option<String>>;

  fn delete(&self, key: &str) -> Result<()>;

  fn delete_all(&self) -> Result<()>;

  fn list_keys(&self) -> Result<BTreeSet<String>>;

  /// Keys starting with `prefix`.
  fn list_keys_with_prefix(&self, prefix: &str) -> Result<BTreeSet<String>>;
}

/// Smallest string greater than every string starting with `prefix`.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
  let mut chars: Vec<char> = prefix.chars().collect();
  while let Some(last) = chars.pop() {
    if let Some(next) = char::from_u32(last as u32 + 1) {
      chars.push(next);
      return Some(chars.into_iter().collect());
    }
  }
  None
}

/// SQLite-backed fingerprint store sharing the cache database.
pub struct SqliteFingerprintStore {
  db: Database,
}

impl SqliteFingerprintStore {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

impl FingerprintStore for SqliteFingerprintStore {
  fn save(&self, key: &str, value: &str) -> Result<()> {
    self
      .db
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO fingerprints (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to save fingerprint {}: {}", key, e))?;
    Ok(())
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    self
      .db
      .lock()?
      .query_row(
        "SELECT value FROM fingerprints WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read fingerprint {}: {}", key, e))
  }

  fn delete(&self, key: &str) -> Result<()> {
    self
      .db
      .lock()?
      .execute("DELETE FROM fingerprints WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to delete fingerprint {}: {}", key, e))?;
    Ok(())
  }

  fn delete_all(&self) -> Result<()> {
    self
      .db
      .lock()?
      .execute("DELETE FROM fingerprints", [])
      .map_err(|e| eyre!("Failed to clear fingerprints: {}", e))?;
    Ok(())
  }

  fn list_keys(&self) -> Result<BTreeSet<String>> {
    let conn = self.db.lock()?;
    let mut stmt = conn
      .prepare("SELECT key FROM fingerprints")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list fingerprint keys: {}", e))?
      .collect::<rusqlite::Result<BTreeSet<String>>>()
      .map_err(|e| eyre!("Failed to read fingerprint key: {}", e))?;

    Ok(keys)
  }

  fn list_keys_with_prefix(&self, prefix: &str) -> Result<BTreeSet<String>> {
    let conn = self.db.lock()?;

    // Range scan on the primary key; text compares bytewise
    let mut stmt = conn
      .prepare("SELECT key FROM fingerprints WHERE key >= ?1 AND (?2 IS NULL OR key < ?2)")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys = stmt
      .query_map(params![prefix, prefix_upper_bound(prefix)], |row| {
        row.get::<_, String>(0)
      })
      .map_err(|e| eyre!("Failed to list fingerprint keys under {}: {}", prefix, e))?
      .collect::<rusqlite::Result<BTreeSet<String>>>()
      .map_err(|e| eyre!("Failed to read fingerprint key: {}", e))?;

    Ok(keys)
  }
}
