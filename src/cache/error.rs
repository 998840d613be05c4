//! Failures surfaced by coordinators and repositories.

use color_eyre::Report;

/// Error returned across the sync subsystem's public contract.
///
/// An empty remote scope is not an error; it arrives as
/// [`RemoteFetch::Empty`](super::traits::RemoteFetch::Empty).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
  /// The remote store rejected or could not receive a write
  #[error("remote store unavailable: {0}")]
  RemoteUnavailable(String),

  /// Cache or fingerprint store read/write failed
  #[error("local store failure: {0}")]
  LocalStore(String),

  /// Mutation attempted on an entity type without a remote writer
  #[error("{0} are read-only")]
  ReadOnly(&'static str),

  /// A collaborator panicked mid-operation
  #[error("unexpected failure: {0}")]
  Unexpected(String),
}

impl SyncError {
  pub fn local(report: Report) -> Self {
    SyncError::LocalStore(format!("{:#}", report))
  }

  pub fn remote(report: Report) -> Self {
    SyncError::RemoteUnavailable(format!("{:#}", report))
  }
}
