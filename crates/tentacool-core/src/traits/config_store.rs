// # Config Store Trait
//
// Defines the interface for durable declared-state storage.
//
// ## Purpose
//
// The config store is the single source of truth for what the caller asked
// for. It holds one bucket per domain (`address`, `dhcp`, `dns`, `routes`),
// each an ordered map of UTF-8 keys to JSON values, plus a per-bucket
// sequence counter used to allocate record ids.
//
// ## Implementations
//
// - File-based: single JSON document, atomic write-then-rename
// - In-memory: tests and dry runs
//
// ## Usage
//
// ```rust,ignore
// use tentacool_core::{ConfigStore, Domain};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* ConfigStore implementation */;
//
//     let id = store.next_sequence(Domain::Address).await?;
//     store.insert(Domain::Address, &id.to_string(), serde_json::json!({})).await?;
//
//     for (key, value) in store.list(Domain::Address).await? {
//         println!("{key}: {value}");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::records::Domain;

/// Trait for config store implementations
///
/// Values are opaque JSON to the store; encoding and decoding of records is
/// owned by the reconcilers (see [`crate::records::StoredRecord`]).
///
/// # Atomicity
///
/// Every method is atomic with respect to every other method on the same
/// store: a reader never observes a half-applied write, and a failed write
/// leaves both the durable copy and any in-memory view unchanged.
///
/// Multi-step read-modify-write sequences (load previous, apply, persist) are
/// NOT atomic at this level; callers serialize them per key with
/// [`crate::locks::KeyLocks`].
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Implement locking for thread safety
/// - ✅ Cache state in memory (the durable copy stays authoritative)
///
/// ## Forbidden Capabilities
/// - ❌ Touch live system state (owned by `SystemAdapter`)
/// - ❌ Decide when to write relative to live changes (owned by reconcilers)
/// - ❌ Retry failed I/O internally (errors surface to the caller)
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Get the value stored under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: The stored value
    /// - `Ok(None)`: No such key
    /// - `Err(Error)`: Storage error
    async fn get(
        &self,
        domain: Domain,
        key: &str,
    ) -> Result<Option<serde_json::Value>, crate::Error>;

    /// List all entries of a bucket
    ///
    /// Entries come back in insertion order. Overwriting a key keeps its
    /// original position.
    async fn list(&self, domain: Domain) -> Result<Vec<(String, serde_json::Value)>, crate::Error>;

    /// Create or overwrite the value under `key`
    async fn put(
        &self,
        domain: Domain,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), crate::Error>;

    /// Store a value under a key that must not exist yet
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Stored
    /// - `Err(Error::Conflict)`: The key is already present
    /// - `Err(Error)`: Storage error
    async fn insert(
        &self,
        domain: Domain,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), crate::Error>;

    /// Delete the value under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted
    /// - `Err(Error::NotFound)`: The key was absent
    /// - `Err(Error)`: Storage error
    async fn delete(&self, domain: Domain, key: &str) -> Result<(), crate::Error>;

    /// Allocate the next sequence number of a bucket
    ///
    /// Strictly increasing, never reused for the lifetime of the bucket,
    /// durable across restarts. The first value is 1.
    async fn next_sequence(&self, domain: Domain) -> Result<u64, crate::Error>;

    /// Persist any pending changes
    ///
    /// Called on graceful shutdown before [`ConfigStore::close`].
    async fn flush(&self) -> Result<(), crate::Error>;

    /// Flush and stop accepting writes
    ///
    /// The store is opened once and closed once per process.
    async fn close(&self) -> Result<(), crate::Error> {
        self.flush().await
    }
}
