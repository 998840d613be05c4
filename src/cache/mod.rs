//! Fingerprint-based sync and cache-coherence layer.
//!
//! This module is domain-agnostic. For each entity type it:
//! - Fetches a scope's collection from the remote store once per sync
//! - Compares its content fingerprint with the last recorded one
//! - Rewrites the local partition and the fingerprint only on mismatch
//! - Serves the existing partition when the remote store is unavailable

mod error;
mod fingerprint;
mod fingerprint_store;
mod layer;
mod locks;
mod registry;
mod repository;
mod storage;
mod traits;

pub use error::SyncError;
pub use fingerprint::{
  empty_fingerprint, entity_fingerprint, fingerprint, fingerprint_entities,
  fingerprint_of_collection, Canonical, Fingerprint,
};
pub use fingerprint_store::{FingerprintStore, SqliteFingerprintStore};
pub use layer::SyncCoordinator;
pub use locks::ScopeLocks;
pub use registry::FingerprintRegistry;
pub use repository::Repository;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{
  CacheResult, CacheSource, Partition, RemoteFetch, RemoteStore, RemoteWriter, Scope, Syncable,
};
