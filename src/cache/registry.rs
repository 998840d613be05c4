//! Per-entity-type namespaces over the fingerprint store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::fingerprint::Fingerprint;
use super::fingerprint_store::FingerprintStore;

const FINGERPRINT: &str = "fp";
const SYNCED_AT: &str = "synced_at";
const ENTITY: &str = "entity";

/// Fingerprint records for one entity type.
///
/// Keys are `<namespace>:fp:<scope>`, `<namespace>:synced_at:<scope>` and
/// `<namespace>:entity:<scope>:<id>`.
#[derive(Clone)]
pub struct FingerprintRegistry {
  store: Arc<dyn FingerprintStore>,
  namespace: &'static str,
}

impl FingerprintRegistry {
  pub fn new(store: Arc<dyn FingerprintStore>, namespace: &'static str) -> Self {
    Self { store, namespace }
  }

  pub fn namespace(&self) -> &'static str {
    self.namespace
  }

  fn key(&self, kind: &str, scope_key: &str) -> String {
    format!("{}:{}:{}", self.namespace, kind, scope_key)
  }

  fn entity_prefix(&self, scope_key: &str) -> String {
    format!("{}:", self.key(ENTITY, scope_key))
  }

  /// Last recorded collection fingerprint for the scope.
  pub fn fingerprint(&self, scope_key: &str) -> Result<Option<Fingerprint>> {
    Ok(
      self
        .store
        .get(&self.key(FINGERPRINT, scope_key))?
        .map(Fingerprint::from_stored),
    )
  }

  pub fn save_fingerprint(&self, scope_key: &str, fp: &Fingerprint) -> Result<()> {
    self.store.save(&self.key(FINGERPRINT, scope_key), fp.as_str())
  }

  /// Drop only the collection fingerprint, leaving the scope Unsynced.
  pub fn forget_fingerprint(&self, scope_key: &str) -> Result<()> {
    self.store.delete(&self.key(FINGERPRINT, scope_key))
  }

  pub fn last_synced(&self, scope_key: &str) -> Result<Option<DateTime<Utc>>> {
    match self.store.get(&self.key(SYNCED_AT, scope_key))? {
      Some(raw) => DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| eyre!("Failed to parse sync timestamp '{}': {}", raw, e)),
      None => Ok(None),
    }
  }

  pub fn mark_synced(&self, scope_key: &str, at: DateTime<Utc>) -> Result<()> {
    self
      .store
      .save(&self.key(SYNCED_AT, scope_key), &at.to_rfc3339())
  }

  /// Ids in `current` whose fingerprint is new or differs from the recorded one.
  pub fn changed_entities(
    &self,
    scope_key: &str,
    current: &BTreeMap<String, Fingerprint>,
  ) -> Result<Vec<String>> {
    let recorded = self.entity_fingerprints(scope_key)?;
    Ok(
      current
        .iter()
        .filter(|(id, fp)| recorded.get(*id) != Some(*fp))
        .map(|(id, _)| id.clone())
        .collect(),
    )
  }

  /// Replace the scope's per-entity fingerprints with `current`.
  pub fn save_entity_fingerprints(
    &self,
    scope_key: &str,
    current: &BTreeMap<String, Fingerprint>,
  ) -> Result<()> {
    let prefix = self.entity_prefix(scope_key);
    for key in self.keys_with_prefix(&prefix)? {
      let id = &key[prefix.len()..];
      if !current.contains_key(id) {
        self.store.delete(&key)?;
      }
    }
    for (id, fp) in current {
      self.store.save(&format!("{}{}", prefix, id), fp.as_str())?;
    }
    Ok(())
  }

  fn entity_fingerprints(&self, scope_key: &str) -> Result<BTreeMap<String, Fingerprint>> {
    let prefix = self.entity_prefix(scope_key);
    let mut recorded = BTreeMap::new();
    for key in self.keys_with_prefix(&prefix)? {
      if let Some(value) = self.store.get(&key)? {
        recorded.insert(key[prefix.len()..].to_string(), Fingerprint::from_stored(value));
      }
    }
    Ok(recorded)
  }

  /// Remove every record for the scope.
  pub fn clear_scope(&self, scope_key: &str) -> Result<()> {
    self.forget_fingerprint(scope_key)?;
    self.store.delete(&self.key(SYNCED_AT, scope_key))?;
    for key in self.keys_with_prefix(&self.entity_prefix(scope_key))? {
      self.store.delete(&key)?;
    }
    Ok(())
  }

  /// Scope keys that currently hold a fingerprint record.
  pub fn scopes(&self) -> Result<BTreeSet<String>> {
    let prefix = format!("{}:{}:", self.namespace, FINGERPRINT);
    Ok(
      self
        .keys_with_prefix(&prefix)?
        .into_iter()
        .map(|key| key[prefix.len()..].to_string())
        .collect(),
    )
  }

  fn keys_with_prefix(&self, prefix: &str) -> Result<BTreeSet<String>> {
    self.store.list_keys_with_prefix(prefix)
  }
}
