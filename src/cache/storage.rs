//! Cache storage trait and SQLite implementation.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use rusqlite::params;

use super::traits::{Scope, Syncable};
use crate::db::Database;

/// Trait for local cache storage backends.
///
/// A partition is identified by the entity type and the scope key.
pub trait CacheStorage: Send + Sync {
  /// Atomically replace the partition's content with `entities`.
  fn replace_scope<T: Syncable>(&self, scope: &T::Scope, entities: &[T]) -> Result<()>;

  /// Read the partition in stored order. Missing partitions read as empty.
  fn read_scope<T: Syncable>(&self, scope_key: &str) -> Result<Vec<T>>;

  /// Delete the partition.
  fn delete_scope<T: Syncable>(&self, scope_key: &str) -> Result<()>;

  /// Keys of partitions whose window ends strictly before `cutoff`.
  fn scopes_ending_before<T: Syncable>(&self, cutoff: NaiveDate) -> Result<Vec<String>>;

  /// Delete every partition of the entity type.
  fn clear_all<T: Syncable>(&self) -> Result<()>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  db: Database,
}

impl SqliteStorage {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

impl CacheStorage for SqliteStorage {
  fn replace_scope<T: Syncable>(&self, scope: &T::Scope, entities: &[T]) -> Result<()> {
    let mut conn = self.db.lock()?;
    let entity_type = T::entity_type();
    let scope_key = scope.key();
    let window_end = scope.window_end().map(|d| d.to_string());

    // Dropping the transaction without commit rolls it back
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entities WHERE entity_type = ? AND scope_key = ?",
      params![entity_type, scope_key],
    )
    .map_err(|e| eyre!("Failed to delete old entities for {}: {}", scope_key, e))?;

    tx.execute(
      "INSERT OR REPLACE INTO cache_scopes (entity_type, scope_key, window_end, cached_at, entity_count)
       VALUES (?, ?, ?, datetime('now'), ?)",
      params![entity_type, scope_key, window_end, entities.len()],
    )
    .map_err(|e| eyre!("Failed to update scope {}: {}", scope_key, e))?;

    for (position, entity) in entities.iter().enumerate() {
      let data =
        serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

      tx.execute(
        "INSERT INTO cache_entities (entity_type, scope_key, position, entity_key, data)
         VALUES (?, ?, ?, ?, ?)",
        params![entity_type, scope_key, position, entity.id(), data],
      )
      .map_err(|e| eyre!("Failed to store entity {}: {}", entity.id(), e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn read_scope<T: Syncable>(&self, scope_key: &str) -> Result<Vec<T>> {
    let conn = self.db.lock()?;
    let entity_type = T::entity_type();

    let mut stmt = conn
      .prepare(
        "SELECT data FROM cache_entities
         WHERE entity_type = ? AND scope_key = ?
         ORDER BY position",
      )
      .map_err(|e| eyre!("Failed to prepare entity query: {}", e))?;

    let rows = stmt
      .query_map(params![entity_type, scope_key], |row| row.get::<_, Vec<u8>>(0))
      .map_err(|e| eyre!("Failed to query entities: {}", e))?;

    // A skipped row would break fingerprint coherence, so corrupt data is an error
    let mut entities = Vec::new();
    for row in rows {
      let data = row.map_err(|e| eyre!("Failed to read entity row: {}", e))?;
      let entity = serde_json::from_slice(&data)
        .map_err(|e| eyre!("Failed to deserialize cached {}: {}", entity_type, e))?;
      entities.push(entity);
    }

    Ok(entities)
  }

  fn delete_scope<T: Syncable>(&self, scope_key: &str) -> Result<()> {
    let mut conn = self.db.lock()?;
    let entity_type = T::entity_type();

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
    tx.execute(
      "DELETE FROM cache_entities WHERE entity_type = ? AND scope_key = ?",
      params![entity_type, scope_key],
    )
    .map_err(|e| eyre!("Failed to delete entities for {}: {}", scope_key, e))?;
    tx.execute(
      "DELETE FROM cache_scopes WHERE entity_type = ? AND scope_key = ?",
      params![entity_type, scope_key],
    )
    .map_err(|e| eyre!("Failed to delete scope {}: {}", scope_key, e))?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn scopes_ending_before<T: Syncable>(&self, cutoff: NaiveDate) -> Result<Vec<String>> {
    let conn = self.db.lock()?;

    // ISO dates compare correctly as text
    let mut stmt = conn
      .prepare(
        "SELECT scope_key FROM cache_scopes
         WHERE entity_type = ? AND window_end IS NOT NULL AND window_end < ?
         ORDER BY window_end",
      )
      .map_err(|e| eyre!("Failed to prepare scope query: {}", e))?;

    let keys = stmt
      .query_map(params![T::entity_type(), cutoff.to_string()], |row| {
        row.get::<_, String>(0)
      })
      .map_err(|e| eyre!("Failed to query scopes: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read scope row: {}", e))?;

    Ok(keys)
  }

  fn clear_all<T: Syncable>(&self) -> Result<()> {
    let mut conn = self.db.lock()?;
    let entity_type = T::entity_type();

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
    tx.execute(
      "DELETE FROM cache_entities WHERE entity_type = ?",
      params![entity_type],
    )
    .map_err(|e| eyre!("Failed to clear {} entities: {}", entity_type, e))?;
    tx.execute(
      "DELETE FROM cache_scopes WHERE entity_type = ?",
      params![entity_type],
    )
    .map_err(|e| eyre!("Failed to clear {} scopes: {}", entity_type, e))?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::workforce::testdata::{employee, shift};
  use crate::workforce::types::{CompanyScope, Employee, Shift, WeekScope};

  fn storage() -> SqliteStorage {
    SqliteStorage::new(Database::open_in_memory().unwrap())
  }

  #[test]
  fn test_replace_and_read_preserve_order() {
    let storage = storage();
    let scope = CompanyScope::new("acme");
    let entities = vec![employee("e2", "Bea"), employee("e1", "Al")];

    storage.replace_scope(&scope, &entities).unwrap();
    let read: Vec<Employee> = storage.read_scope(&scope.key()).unwrap();
    assert_eq!(read, entities);
  }

  #[test]
  fn test_replace_drops_previous_rows() {
    let storage = storage();
    let scope = CompanyScope::new("acme");
    storage
      .replace_scope(&scope, &[employee("e1", "Al"), employee("e2", "Bea")])
      .unwrap();
    storage.replace_scope(&scope, &[employee("e3", "Cy")]).unwrap();

    let read: Vec<Employee> = storage.read_scope(&scope.key()).unwrap();
    assert_eq!(read, vec![employee("e3", "Cy")]);
  }

  #[test]
  fn test_repeated_ids_keep_every_row() {
    let storage = storage();
    let scope = CompanyScope::new("acme");
    let entities = vec![employee("e1", "Al"), employee("e1", "Alan"), employee("e2", "Bea")];

    storage.replace_scope(&scope, &entities).unwrap();
    let read: Vec<Employee> = storage.read_scope(&scope.key()).unwrap();
    assert_eq!(read, entities);
  }

  #[test]
  fn test_empty_window_stays_listed() {
    let storage = storage();
    let week = WeekScope::new("acme", NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    storage.replace_scope::<Shift>(&week, &[]).unwrap();

    assert!(storage.read_scope::<Shift>(&week.key()).unwrap().is_empty());
    let cutoff = NaiveDate::from_ymd_opt(2026, 7, 21).unwrap();
    assert_eq!(storage.scopes_ending_before::<Shift>(cutoff).unwrap(), vec![week.key()]);
  }

  #[test]
  fn test_partitions_are_isolated() {
    let storage = storage();
    let acme = CompanyScope::new("acme");
    let globex = CompanyScope::new("globex");
    storage.replace_scope(&acme, &[employee("e1", "Al")]).unwrap();
    storage.replace_scope(&globex, &[employee("e1", "Al")]).unwrap();

    storage.delete_scope::<Employee>(&acme.key()).unwrap();

    assert!(storage.read_scope::<Employee>(&acme.key()).unwrap().is_empty());
    assert_eq!(storage.read_scope::<Employee>(&globex.key()).unwrap().len(), 1);
  }

  #[test]
  fn test_scopes_ending_before() {
    let storage = storage();
    let old = WeekScope::new("acme", NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    let recent = WeekScope::new("acme", NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
    storage
      .replace_scope(&old, &[shift("s1", "e1", old.week_start)])
      .unwrap();
    storage
      .replace_scope(&recent, &[shift("s2", "e1", recent.week_start)])
      .unwrap();

    let cutoff = NaiveDate::from_ymd_opt(2026, 7, 21).unwrap();
    let keys = storage.scopes_ending_before::<Shift>(cutoff).unwrap();
    assert_eq!(keys, vec![old.key()]);
  }

  #[test]
  fn test_corrupt_row_is_an_error() {
    let storage = storage();
    let scope = CompanyScope::new("acme");
    storage.replace_scope(&scope, &[employee("e1", "Al")]).unwrap();
    storage
      .db
      .lock()
      .unwrap()
      .execute("UPDATE cache_entities SET data = X'00'", [])
      .unwrap();

    assert!(storage.read_scope::<Employee>(&scope.key()).is_err());
  }
}
