//! Per-scope mutual exclusion for sync operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async mutex per scope key.
#[derive(Default)]
pub struct ScopeLocks {
  locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ScopeLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Wait for exclusive access to `scope_key`.
  pub async fn acquire(&self, scope_key: &str) -> OwnedMutexGuard<()> {
    let lock = {
      // The map is never left half-updated, so a poisoned guard is still usable
      let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
      // Drop entries nobody is holding or waiting on
      locks.retain(|key, lock| key == scope_key || Arc::strong_count(lock) > 1);
      Arc::clone(locks.entry(scope_key.to_string()).or_default())
    };
    lock.lock_owned().await
  }
}
