//! Sync coordinator: the fingerprint-based coherence protocol.

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::fingerprint::{
  empty_fingerprint, entity_fingerprint, fingerprint_entities, Fingerprint,
};
use super::locks::ScopeLocks;
use super::registry::FingerprintRegistry;
use super::storage::CacheStorage;
use super::traits::{CacheResult, CacheSource, Partition, RemoteFetch, RemoteStore, Scope, Syncable};

/// Keeps one entity type's cache partitions coherent with the remote store.
///
/// Per scope key the coordinator is either Unsynced (no fingerprint
/// recorded) or Synced(fp), where the partition's content hashes to `fp`.
/// A fingerprint is only ever recorded after the partition holding that
/// content has been committed.
pub struct SyncCoordinator<T: Syncable, S: CacheStorage> {
  remote: Arc<dyn RemoteStore<T>>,
  storage: Arc<S>,
  registry: FingerprintRegistry,
  locks: Option<Arc<ScopeLocks>>,
}

impl<T: Syncable, S: CacheStorage> SyncCoordinator<T, S> {
  pub fn new(
    remote: Arc<dyn RemoteStore<T>>,
    storage: Arc<S>,
    registry: FingerprintRegistry,
  ) -> Self {
    Self {
      remote,
      storage,
      registry,
      locks: Some(Arc::new(ScopeLocks::new())),
    }
  }

  /// Enable or disable per-scope serialization of sync operations.
  ///
  /// Without it, concurrent operations on the same scope race on the
  /// partition and its fingerprint record.
  pub fn with_scope_serialization(mut self, enabled: bool) -> Self {
    self.locks = enabled.then(|| Arc::new(ScopeLocks::new()));
    self
  }

  pub fn registry(&self) -> &FingerprintRegistry {
    &self.registry
  }

  async fn lock_scope(&self, scope_key: &str) -> Option<OwnedMutexGuard<()>> {
    match &self.locks {
      Some(locks) => Some(locks.acquire(scope_key).await),
      None => None,
    }
  }

  /// Sync the scope if its remote content changed, then return the partition.
  ///
  /// Performs exactly one remote fetch. When the remote store is
  /// unavailable the existing partition is served untouched.
  pub async fn sync_if_needed(
    &self,
    scope: &T::Scope,
  ) -> Result<CacheResult<Partition<T>>, SyncError> {
    let scope_key = scope.key();
    let _guard = self.lock_scope(&scope_key).await;
    self.sync_locked(scope, &scope_key).await
  }

  /// Discard the recorded fingerprint and run a full sync.
  pub async fn force_sync(&self, scope: &T::Scope) -> Result<(), SyncError> {
    let scope_key = scope.key();
    let _guard = self.lock_scope(&scope_key).await;

    self
      .registry
      .forget_fingerprint(&scope_key)
      .map_err(SyncError::local)?;
    self.sync_locked(scope, &scope_key).await.map(|_| ())
  }

  /// Drop the partition and every fingerprint record for the scope.
  pub async fn invalidate(&self, scope: &T::Scope) -> Result<(), SyncError> {
    let scope_key = scope.key();
    let _guard = self.lock_scope(&scope_key).await;
    self.evict(&scope_key)?;
    info!(entity = T::entity_type(), scope = %scope_key, "Invalidated cache partition");
    Ok(())
  }

  /// Evict every partition whose window ended before `cutoff`.
  pub async fn evict_windows_before(&self, cutoff: NaiveDate) -> Result<Vec<String>, SyncError> {
    let keys = self
      .storage
      .scopes_ending_before::<T>(cutoff)
      .map_err(SyncError::local)?;

    for scope_key in &keys {
      let _guard = self.lock_scope(scope_key).await;
      self.evict(scope_key)?;
    }

    if !keys.is_empty() {
      info!(
        entity = T::entity_type(),
        count = keys.len(),
        %cutoff,
        "Evicted expired cache partitions"
      );
    }
    Ok(keys)
  }

  async fn sync_locked(
    &self,
    scope: &T::Scope,
    scope_key: &str,
  ) -> Result<CacheResult<Partition<T>>, SyncError> {
    let stored = self
      .registry
      .fingerprint(scope_key)
      .map_err(SyncError::local)?;

    // Only await point; nothing local has been touched before it
    let fetched = self.remote.fetch(scope).await;

    let source = match fetched {
      RemoteFetch::Items(items) if !items.is_empty() => {
        let current = fingerprint_entities(&items);
        if stored.as_ref() == Some(&current) {
          debug!(
            entity = T::entity_type(),
            scope = %scope_key,
            "Remote content unchanged, skipping cache write"
          );
          self.mark_synced(scope_key)?;
          CacheSource::Unchanged
        } else {
          self.commit(scope, scope_key, &items, &current, stored.as_ref())?;
          CacheSource::Network
        }
      }
      RemoteFetch::Items(_) | RemoteFetch::Empty => {
        self.commit_empty(scope, scope_key)?;
        CacheSource::Network
      }
      RemoteFetch::Failed(message) => {
        warn!(
          entity = T::entity_type(),
          scope = %scope_key,
          error = %message,
          "Remote fetch failed, serving cached partition"
        );
        CacheSource::Offline
      }
    };

    let rows = self
      .storage
      .read_scope::<T>(scope_key)
      .map_err(SyncError::local)?;
    let synced_at = self
      .registry
      .last_synced(scope_key)
      .map_err(SyncError::local)?;

    Ok(CacheResult::new(Partition::from_rows(rows), source, synced_at))
  }

  /// Replace the partition and record its fingerprint.
  ///
  /// The stored fingerprint is removed first, so a failure at any later step
  /// leaves the scope Unsynced rather than recording content the cache lacks.
  /// A rejected partition write rolls back, so `previous` is put back and the
  /// scope keeps its old coherent state.
  fn commit(
    &self,
    scope: &T::Scope,
    scope_key: &str,
    items: &[T],
    current: &Fingerprint,
    previous: Option<&Fingerprint>,
  ) -> Result<(), SyncError> {
    let per_entity: BTreeMap<String, Fingerprint> = items
      .iter()
      .map(|item| (item.id().to_string(), entity_fingerprint(item)))
      .collect();
    let changed = self
      .registry
      .changed_entities(scope_key, &per_entity)
      .map_err(SyncError::local)?;

    self
      .registry
      .forget_fingerprint(scope_key)
      .map_err(SyncError::local)?;
    if let Err(e) = self.storage.replace_scope(scope, items) {
      if let Some(previous) = previous {
        if let Err(restore) = self.registry.save_fingerprint(scope_key, previous) {
          warn!(
            entity = T::entity_type(),
            scope = %scope_key,
            error = %restore,
            "Failed to restore fingerprint, scope left unsynced"
          );
        }
      }
      return Err(SyncError::local(e));
    }
    self
      .registry
      .save_fingerprint(scope_key, current)
      .map_err(SyncError::local)?;
    self
      .registry
      .save_entity_fingerprints(scope_key, &per_entity)
      .map_err(SyncError::local)?;
    self.mark_synced(scope_key)?;

    info!(
      entity = T::entity_type(),
      scope = %scope_key,
      total = items.len(),
      changed = changed.len(),
      fingerprint = %current,
      "Refreshed cache partition"
    );
    Ok(())
  }

  /// Clear the partition of a remotely empty scope and record the empty fingerprint.
  ///
  /// The partition is rewritten as zero rows rather than deleted, so windowed
  /// scopes stay visible to `evict_windows_before`.
  fn commit_empty(&self, scope: &T::Scope, scope_key: &str) -> Result<(), SyncError> {
    self
      .registry
      .clear_scope(scope_key)
      .map_err(SyncError::local)?;
    self
      .storage
      .replace_scope::<T>(scope, &[])
      .map_err(SyncError::local)?;
    self
      .registry
      .save_fingerprint(scope_key, &empty_fingerprint())
      .map_err(SyncError::local)?;
    self.mark_synced(scope_key)?;

    info!(entity = T::entity_type(), scope = %scope_key, "Remote scope is empty, cleared partition");
    Ok(())
  }

  fn evict(&self, scope_key: &str) -> Result<(), SyncError> {
    self
      .registry
      .clear_scope(scope_key)
      .map_err(SyncError::local)?;
    self
      .storage
      .delete_scope::<T>(scope_key)
      .map_err(SyncError::local)
  }

  fn mark_synced(&self, scope_key: &str) -> Result<(), SyncError> {
    self
      .registry
      .mark_synced(scope_key, Utc::now())
      .map_err(SyncError::local)
  }
}
