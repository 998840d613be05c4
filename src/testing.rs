//! Stub collaborators for exercising the sync subsystem in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::{
  CacheStorage, FingerprintRegistry, FingerprintStore, RemoteFetch, RemoteStore, RemoteWriter,
  SqliteFingerprintStore, SqliteStorage, SyncCoordinator, Syncable,
};
use crate::db::Database;

/// Remote store answering with queued responses.
pub struct ScriptedRemote<T> {
  responses: Mutex<VecDeque<RemoteFetch<T>>>,
  yields: AtomicUsize,
  in_flight: AtomicUsize,
  pub fetches: AtomicUsize,
  pub max_in_flight: AtomicUsize,
  pub panic_next: AtomicBool,
}

impl<T> ScriptedRemote<T> {
  pub fn new() -> Self {
    Self {
      responses: Mutex::new(VecDeque::new()),
      yields: AtomicUsize::new(0),
      in_flight: AtomicUsize::new(0),
      fetches: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
      panic_next: AtomicBool::new(false),
    }
  }

  pub fn push(&self, response: RemoteFetch<T>) {
    self.responses.lock().unwrap().push_back(response);
  }

  /// Yield to the scheduler this many times inside every fetch.
  pub fn set_yields(&self, yields: usize) {
    self.yields.store(yields, Ordering::SeqCst);
  }
}

#[async_trait]
impl<T: Syncable> RemoteStore<T> for ScriptedRemote<T> {
  async fn fetch(&self, _scope: &T::Scope) -> RemoteFetch<T> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    if self.panic_next.swap(false, Ordering::SeqCst) {
      panic!("scripted remote panic");
    }

    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    for _ in 0..self.yields.load(Ordering::SeqCst) {
      tokio::task::yield_now().await;
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    self
      .responses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| RemoteFetch::Failed("no scripted response".into()))
  }
}

/// Remote writer answering with queued results.
pub struct ScriptedWriter {
  results: Mutex<VecDeque<std::result::Result<String, String>>>,
  pub calls: AtomicUsize,
}

impl ScriptedWriter {
  pub fn new() -> Self {
    Self {
      results: Mutex::new(VecDeque::new()),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn push(&self, result: std::result::Result<String, String>) {
    self.results.lock().unwrap().push_back(result);
  }
}

#[async_trait]
impl<T: Syncable> RemoteWriter<T> for ScriptedWriter {
  async fn update(&self, _entity: &T) -> Result<String> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match self.results.lock().unwrap().pop_front() {
      Some(Ok(id)) => Ok(id),
      Some(Err(message)) => Err(eyre!(message)),
      None => Err(eyre!("no scripted result")),
    }
  }
}

/// SQLite storage that counts mutations and can be told to fail.
pub struct CountingStorage {
  inner: SqliteStorage,
  pub replaces: AtomicUsize,
  pub deletes: AtomicUsize,
  pub fail_writes: AtomicBool,
  pub fail_reads: AtomicBool,
}

impl CountingStorage {
  pub fn new(db: Database) -> Self {
    Self {
      inner: SqliteStorage::new(db),
      replaces: AtomicUsize::new(0),
      deletes: AtomicUsize::new(0),
      fail_writes: AtomicBool::new(false),
      fail_reads: AtomicBool::new(false),
    }
  }

  fn check_write(&self) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(eyre!("disk full"));
    }
    Ok(())
  }
}

impl CacheStorage for CountingStorage {
  fn replace_scope<T: Syncable>(&self, scope: &T::Scope, entities: &[T]) -> Result<()> {
    self.check_write()?;
    self.replaces.fetch_add(1, Ordering::SeqCst);
    self.inner.replace_scope(scope, entities)
  }

  fn read_scope<T: Syncable>(&self, scope_key: &str) -> Result<Vec<T>> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(eyre!("database is locked"));
    }
    self.inner.read_scope(scope_key)
  }

  fn delete_scope<T: Syncable>(&self, scope_key: &str) -> Result<()> {
    self.check_write()?;
    self.deletes.fetch_add(1, Ordering::SeqCst);
    self.inner.delete_scope::<T>(scope_key)
  }

  fn scopes_ending_before<T: Syncable>(&self, cutoff: NaiveDate) -> Result<Vec<String>> {
    self.inner.scopes_ending_before::<T>(cutoff)
  }

  fn clear_all<T: Syncable>(&self) -> Result<()> {
    self.check_write()?;
    self.inner.clear_all::<T>()
  }
}

/// Coordinator wired to stub collaborators over an in-memory database.
pub struct Harness<T: Syncable> {
  pub remote: Arc<ScriptedRemote<T>>,
  pub writer: Arc<ScriptedWriter>,
  pub storage: Arc<CountingStorage>,
  pub fingerprints: Arc<dyn FingerprintStore>,
  pub registry: FingerprintRegistry,
  pub coordinator: SyncCoordinator<T, CountingStorage>,
}

impl<T: Syncable> Harness<T> {
  /// A fresh coordinator sharing this harness's collaborators.
  pub fn rebuild_coordinator(&self, serialize_scopes: bool) -> SyncCoordinator<T, CountingStorage> {
    SyncCoordinator::new(
      self.remote.clone(),
      self.storage.clone(),
      self.registry.clone(),
    )
    .with_scope_serialization(serialize_scopes)
  }
}

pub fn harness<T: Syncable>() -> Harness<T> {
  let db = Database::open_in_memory().unwrap();
  let remote = Arc::new(ScriptedRemote::new());
  let storage = Arc::new(CountingStorage::new(db.clone()));
  let fingerprints: Arc<dyn FingerprintStore> = Arc::new(SqliteFingerprintStore::new(db));
  let registry = FingerprintRegistry::new(fingerprints.clone(), T::entity_type());
  let coordinator = SyncCoordinator::new(remote.clone(), storage.clone(), registry.clone());

  Harness {
    remote,
    writer: Arc::new(ScriptedWriter::new()),
    storage,
    fingerprints,
    registry,
    coordinator,
  }
}
