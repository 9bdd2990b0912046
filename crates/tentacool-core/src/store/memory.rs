// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Crash Behavior
//
// - All declarations are lost on restart/crash
// - Startup replay has nothing to reassert
//
// ## When to Use
//
// - Tests
// - Dry runs against a scratch network namespace

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::Buckets;
use crate::Error;
use crate::records::Domain;
use crate::traits::ConfigStore;

/// In-memory config store implementation
///
/// Shares the bucket semantics of the file store (insertion order, per-bucket
/// sequences) without persistence. Clones share the same underlying state.
///
/// # Example
///
/// ```rust
/// use tentacool_core::records::Domain;
/// use tentacool_core::store::MemoryConfigStore;
/// use tentacool_core::traits::ConfigStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryConfigStore::new();
///
///     assert_eq!(store.next_sequence(Domain::Address).await?, 1);
///     store.insert(Domain::Address, "1", serde_json::json!({})).await?;
///     assert_eq!(store.len().await, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<Buckets>>,
}

impl MemoryConfigStore {
    /// Create a new empty memory config store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records across all buckets
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<serde_json::Value>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(domain, key))
    }

    async fn list(&self, domain: Domain) -> Result<Vec<(String, serde_json::Value)>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.list(domain))
    }

    async fn put(&self, domain: Domain, key: &str, value: serde_json::Value) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.put(domain, key, value);
        Ok(())
    }

    async fn insert(
        &self,
        domain: Domain,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(domain, key, value)
    }

    async fn delete(&self, domain: Domain, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.delete(domain, key)
    }

    async fn next_sequence(&self, domain: Domain) -> Result<u64, Error> {
        let mut guard = self.inner.write().await;
        guard.next_sequence(domain)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to persist
        Ok(())
    }
}
