//! Core traits and types for the sync subsystem.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};

/// A coherence unit: one cache partition that is synced and evicted as a whole.
pub trait Scope: Clone + Send + Sync {
  /// Opaque key of the partition (e.g. `acme_2026-10-12`).
  fn key(&self) -> String;

  /// Last day covered by the scope, for date-windowed partitions.
  fn window_end(&self) -> Option<NaiveDate> {
    None
  }
}

/// Trait for entities kept in sync with the remote store.
///
/// `canonical` is the canonicalizer used for fingerprinting. It must include
/// every field whose change counts as a content change and must be stable
/// across process restarts.
pub trait Syncable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Scope type this entity is partitioned by.
  type Scope: Scope;

  /// Stable identifier of the entity.
  fn id(&self) -> &str;

  /// Entity type name for storage organization (e.g. "employees").
  fn entity_type() -> &'static str;

  /// Canonical string fed to the fingerprint generator.
  fn canonical(&self) -> String;

  /// The scope this entity belongs to.
  fn scope(&self) -> Self::Scope;
}

/// Outcome of a single remote fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFetch<T> {
  /// The scope's current remote collection
  Items(Vec<T>),
  /// The scope has no remote records
  Empty,
  /// The remote store could not be reached or answered with an error
  Failed(String),
}

/// Read side of the remote store for one entity type.
#[async_trait]
pub trait RemoteStore<T: Syncable>: Send + Sync {
  async fn fetch(&self, scope: &T::Scope) -> RemoteFetch<T>;
}

/// Write side of the remote store, for entity types that support mutation.
#[async_trait]
pub trait RemoteWriter<T: Syncable>: Send + Sync {
  /// Persist the entity remotely and return its id.
  async fn update(&self, entity: &T) -> Result<String>;
}

/// Content of a cache partition as returned by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Partition<T> {
  Populated(Vec<T>),
  Empty,
}

impl<T> Partition<T> {
  pub fn from_rows(rows: Vec<T>) -> Self {
    if rows.is_empty() {
      Partition::Empty
    } else {
      Partition::Populated(rows)
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Partition::Empty)
  }

  pub fn into_vec(self) -> Vec<T> {
    match self {
      Partition::Populated(rows) => rows,
      Partition::Empty => Vec::new(),
    }
  }
}

/// Result from a sync, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the scope last synced successfully with the remote store
  pub synced_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn new(data: T, source: CacheSource, synced_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source,
      synced_at,
    }
  }
}

/// Indicates where synced data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Remote content changed and the partition was rewritten
  Network,
  /// Remote content matched the recorded fingerprint, nothing was written
  Unchanged,
  /// Remote store unavailable, serving whatever the partition holds
  Offline,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partition_from_rows() {
    assert_eq!(Partition::<u32>::from_rows(vec![]), Partition::Empty);
    assert_eq!(Partition::from_rows(vec![1, 2]), Partition::Populated(vec![1, 2]));
  }

  #[test]
  fn test_empty_partition_folds_to_empty_vec() {
    assert!(Partition::<u32>::Empty.into_vec().is_empty());
  }
}
