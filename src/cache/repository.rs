//! Repository: the per-entity-type façade the rest of the application calls.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

use super::error::SyncError;
use super::layer::SyncCoordinator;
use super::storage::CacheStorage;
use super::traits::{RemoteWriter, Scope, Syncable};

/// Composes a [`SyncCoordinator`] with local reads and optional remote writes.
///
/// Callers only ever see the entities or a [`SyncError`]; an empty partition
/// is an empty `Vec`.
pub struct Repository<T: Syncable, S: CacheStorage> {
  coordinator: SyncCoordinator<T, S>,
  storage: Arc<S>,
  writer: Option<Arc<dyn RemoteWriter<T>>>,
}

impl<T: Syncable, S: CacheStorage> Repository<T, S> {
  pub fn new(coordinator: SyncCoordinator<T, S>, storage: Arc<S>) -> Self {
    Self {
      coordinator,
      storage,
      writer: None,
    }
  }

  /// Allow [`Repository::update`] through the given remote writer.
  pub fn with_writer(mut self, writer: Arc<dyn RemoteWriter<T>>) -> Self {
    self.writer = Some(writer);
    self
  }

  pub fn coordinator(&self) -> &SyncCoordinator<T, S> {
    &self.coordinator
  }

  /// Entities for the scope, syncing first when the remote content changed.
  ///
  /// With `force_refresh` the scope is re-synced unconditionally; if that
  /// fails, whatever the partition currently holds is still returned.
  pub async fn get(&self, scope: &T::Scope, force_refresh: bool) -> Result<Vec<T>, SyncError> {
    contain(self.get_inner(scope, force_refresh)).await
  }

  async fn get_inner(&self, scope: &T::Scope, force_refresh: bool) -> Result<Vec<T>, SyncError> {
    if force_refresh {
      if let Err(e) = self.coordinator.force_sync(scope).await {
        warn!(
          entity = T::entity_type(),
          scope = %scope.key(),
          error = %e,
          "Forced sync failed, reading cached partition"
        );
      }
      return self
        .storage
        .read_scope::<T>(&scope.key())
        .map_err(SyncError::local);
    }

    let result = self.coordinator.sync_if_needed(scope).await?;
    Ok(result.data.into_vec())
  }

  /// Write the entity to the remote store, then refresh its scope.
  ///
  /// Once the remote write succeeded the call succeeds, even if the local
  /// refresh does not.
  pub async fn update(&self, entity: &T) -> Result<String, SyncError> {
    contain(self.update_inner(entity)).await
  }

  async fn update_inner(&self, entity: &T) -> Result<String, SyncError> {
    let writer = self
      .writer
      .as_ref()
      .ok_or(SyncError::ReadOnly(T::entity_type()))?;

    let id = writer.update(entity).await.map_err(SyncError::remote)?;

    let scope = entity.scope();
    if let Err(e) = self.get_inner(&scope, true).await {
      warn!(
        entity = T::entity_type(),
        scope = %scope.key(),
        id = %id,
        error = %e,
        "Remote write succeeded but local refresh failed"
      );
    }
    Ok(id)
  }

  /// Drop the cached partition and its fingerprint records.
  pub async fn invalidate(&self, scope: &T::Scope) -> Result<(), SyncError> {
    contain(self.coordinator.invalidate(scope)).await
  }
}

/// Turn a panic inside `fut` into [`SyncError::Unexpected`].
async fn contain<R>(fut: impl Future<Output = Result<R, SyncError>>) -> Result<R, SyncError> {
  AssertUnwindSafe(fut)
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| Err(SyncError::Unexpected(panic_message(panic))))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "panic with non-string payload".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::fingerprint::fingerprint_entities;
  use crate::cache::traits::RemoteFetch;
  use crate::testing::{harness, Harness};
  use crate::workforce::testdata::{absence, employee};
  use crate::workforce::types::{Absence, CompanyScope, Employee};
  use std::sync::atomic::Ordering;

  fn acme() -> CompanyScope {
    CompanyScope::new("acme")
  }

  fn repository<T: Syncable>(h: &Harness<T>) -> Repository<T, crate::testing::CountingStorage> {
    Repository::new(h.rebuild_coordinator(true), h.storage.clone()).with_writer(h.writer.clone())
  }

  #[tokio::test]
  async fn test_get_returns_synced_entities() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    let items = vec![employee("e1", "Al"), employee("e2", "Bea")];
    h.remote.push(RemoteFetch::Items(items.clone()));

    assert_eq!(repo.get(&acme(), false).await.unwrap(), items);
  }

  #[tokio::test]
  async fn test_get_folds_empty_into_empty_vec() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.remote.push(RemoteFetch::Empty);

    assert!(repo.get(&acme(), false).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_force_refresh_reflects_latest_remote() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.remote.push(RemoteFetch::Items(vec![employee("e1", "Al")]));
    repo.get(&acme(), false).await.unwrap();

    let latest = vec![employee("e1", "Al"), employee("e2", "Bea")];
    h.remote.push(RemoteFetch::Items(latest.clone()));
    assert_eq!(repo.get(&acme(), true).await.unwrap(), latest);
  }

  #[tokio::test]
  async fn test_force_refresh_failure_serves_cache() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    let items = vec![employee("e1", "Al")];
    h.remote.push(RemoteFetch::Items(items.clone()));
    repo.get(&acme(), false).await.unwrap();

    h.storage.fail_writes.store(true, Ordering::SeqCst);
    h.remote.push(RemoteFetch::Items(vec![employee("e2", "Bea")]));
    assert_eq!(repo.get(&acme(), true).await.unwrap(), items);
  }

  #[tokio::test]
  async fn test_force_refresh_read_failure_is_error() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.storage.fail_reads.store(true, Ordering::SeqCst);
    h.remote.push(RemoteFetch::Failed("offline".into()));

    let err = repo.get(&acme(), true).await.unwrap_err();
    assert!(matches!(err, SyncError::LocalStore(_)));
  }

  #[tokio::test]
  async fn test_update_writes_remote_then_refreshes() {
    let h = harness::<Absence>();
    let repo = repository(&h);
    let updated = absence("a1", "e1");
    h.writer.push(Ok("a1".into()));
    h.remote.push(RemoteFetch::Items(vec![updated.clone()]));

    let id = repo.update(&updated).await.unwrap();

    assert_eq!(id, "a1");
    assert_eq!(h.writer.calls.load(Ordering::SeqCst), 1);
    let cached: Vec<Absence> = h.storage.read_scope(&acme().key()).unwrap();
    assert_eq!(cached, vec![updated.clone()]);
    assert_eq!(
      h.registry.fingerprint(&acme().key()).unwrap(),
      Some(fingerprint_entities(&[updated]))
    );
  }

  #[tokio::test]
  async fn test_update_succeeds_when_refresh_fails() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.writer.push(Ok("e1".into()));
    h.storage.fail_writes.store(true, Ordering::SeqCst);
    h.storage.fail_reads.store(true, Ordering::SeqCst);
    h.remote.push(RemoteFetch::Items(vec![employee("e1", "Al")]));

    assert_eq!(repo.update(&employee("e1", "Al")).await.unwrap(), "e1");
  }

  #[tokio::test]
  async fn test_update_remote_failure_skips_refresh() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.writer.push(Err("503 Service Unavailable".into()));

    let err = repo.update(&employee("e1", "Al")).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteUnavailable(_)));
    assert_eq!(h.remote.fetches.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_update_without_writer_is_read_only() {
    let h = harness::<Employee>();
    let repo = Repository::new(h.rebuild_coordinator(true), h.storage.clone());

    let err = repo.update(&employee("e1", "Al")).await.unwrap_err();
    assert_eq!(err, SyncError::ReadOnly("employees"));
  }

  #[tokio::test]
  async fn test_panicking_collaborator_is_contained() {
    let h = harness::<Employee>();
    let repo = repository(&h);
    h.remote.panic_next.store(true, Ordering::SeqCst);

    let err = repo.get(&acme(), false).await.unwrap_err();
    assert_eq!(err, SyncError::Unexpected("scripted remote panic".into()));
  }
}
