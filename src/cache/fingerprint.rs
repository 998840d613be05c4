//! Content fingerprints for entities and entity collections.
//!
//! A collection fingerprint is the SHA-256 of the sorted, `|`-joined
//! per-entity digests, so it does not depend on the order the remote store
//! returned the entities in.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::traits::Syncable;

/// Field delimiter inside canonical strings and between entity digests.
pub const DELIMITER: char = '|';

/// Opaque hex digest of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  /// Wrap a previously persisted fingerprint.
  pub fn from_stored(value: String) -> Self {
    Self(value)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// SHA-256 of a canonical string, hex encoded.
pub fn fingerprint(canonical: &str) -> Fingerprint {
  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  Fingerprint(hex::encode(hasher.finalize()))
}

/// Fingerprint of a single entity's canonical string.
pub fn entity_fingerprint<T: Syncable>(entity: &T) -> Fingerprint {
  fingerprint(&entity.canonical())
}

/// Order-independent fingerprint of a collection.
pub fn fingerprint_of_collection<T, F>(items: &[T], to_canonical: F) -> Fingerprint
where
  F: Fn(&T) -> String,
{
  let mut digests: Vec<Fingerprint> = items
    .iter()
    .map(|item| fingerprint(&to_canonical(item)))
    .collect();
  digests.sort();

  let joined = digests
    .iter()
    .map(Fingerprint::as_str)
    .collect::<Vec<_>>()
    .join(&DELIMITER.to_string());
  fingerprint(&joined)
}

/// Collection fingerprint of syncable entities using their canonicalizer.
pub fn fingerprint_entities<T: Syncable>(items: &[T]) -> Fingerprint {
  fingerprint_of_collection(items, T::canonical)
}

/// Fingerprint recorded for a scope with no remote records.
pub fn empty_fingerprint() -> Fingerprint {
  fingerprint_of_collection::<(), _>(&[], |_| String::new())
}

/// Builder for canonical strings.
///
/// Absent optional fields render as the empty string, so `None` and
/// `Some("")` produce the same canonical form.
#[derive(Debug, Default)]
pub struct Canonical {
  buf: String,
  fields: usize,
}

impl Canonical {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn field(mut self, value: impl fmt::Display) -> Self {
    if self.fields > 0 {
      self.buf.push(DELIMITER);
    }
    self.buf.push_str(&value.to_string());
    self.fields += 1;
    self
  }

  pub fn opt<V: fmt::Display>(self, value: Option<V>) -> Self {
    match value {
      Some(v) => self.field(v),
      None => self.field(""),
    }
  }

  pub fn finish(self) -> String {
    self.buf
  }
}
