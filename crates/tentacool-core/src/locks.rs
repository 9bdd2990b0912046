//! Per-record serialization of live-system changes
//!
//! Two reconciliations of the same `(domain, key)` must never interleave:
//! the adapter has to see `Remove(old)` then `Apply(new)` for one request
//! before the next request loads its own "previous" value. Different keys
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

use crate::records::Domain;

type LockMap = HashMap<(Domain, String), Arc<tokio::sync::Mutex<()>>>;

/// Registry of per-key async mutexes
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<LockMap>,
}

/// Held for the duration of one read-modify-write on a key
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(domain, key)`
    pub async fn lock(&self, domain: Domain, key: &str) -> KeyGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Only the map holds an unused entry
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            locks
                .entry((domain, key.to_string()))
                .or_default()
                .clone()
        };

        KeyGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no key is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
