// # Config Store Implementations
//
// This module provides implementations of the ConfigStore trait for
// different persistence strategies, and the bucket table they share.

pub mod file;
pub mod memory;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::records::Domain;
use crate::traits::ConfigStore;

/// Open the store described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>> {
    match config {
        StoreConfig::File { path } => {
            tracing::info!("Opening config store at {}", path.display());
            Ok(Arc::new(FileConfigStore::new(path).await?))
        }
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory config store, declarations will not survive restart");
            Ok(Arc::new(MemoryConfigStore::new()))
        }
    }
}

/// One stored key/value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub key: String,
    pub value: serde_json::Value,
}

/// One namespace of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Bucket {
    /// Last value handed out by `next_sequence`
    #[serde(default)]
    pub sequence: u64,
    /// Entries in insertion order
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Bucket {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }
}

/// All buckets, keyed by bucket name
///
/// Buckets are created lazily on first write; reads from a missing bucket
/// behave like reads from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Buckets(BTreeMap<String, Bucket>);

impl Buckets {
    fn bucket(&self, domain: Domain) -> Option<&Bucket> {
        self.0.get(domain.bucket())
    }

    fn bucket_mut(&mut self, domain: Domain) -> &mut Bucket {
        self.0.entry(domain.bucket().to_string()).or_default()
    }

    pub fn get(&self, domain: Domain, key: &str) -> Option<serde_json::Value> {
        let bucket = self.bucket(domain)?;
        bucket
            .position(key)
            .map(|index| bucket.entries[index].value.clone())
    }

    pub fn list(&self, domain: Domain) -> Vec<(String, serde_json::Value)> {
        self.bucket(domain)
            .map(|bucket| {
                bucket
                    .entries
                    .iter()
                    .map(|entry| (entry.key.clone(), entry.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn put(&mut self, domain: Domain, key: &str, value: serde_json::Value) {
        let bucket = self.bucket_mut(domain);
        match bucket.position(key) {
            Some(index) => bucket.entries[index].value = value,
            None => bucket.entries.push(Entry {
                key: key.to_string(),
                value,
            }),
        }
    }

    pub fn insert(&mut self, domain: Domain, key: &str, value: serde_json::Value) -> Result<()> {
        if self.get(domain, key).is_some() {
            return Err(Error::conflict(format!(
                "{} '{}' already exists",
                domain, key
            )));
        }
        self.put(domain, key, value);
        Ok(())
    }

    pub fn delete(&mut self, domain: Domain, key: &str) -> Result<()> {
        let bucket = self.bucket_mut(domain);
        match bucket.position(key) {
            Some(index) => {
                bucket.entries.remove(index);
                Ok(())
            }
            None => Err(Error::not_found(format!("{} '{}'", domain, key))),
        }
    }

    pub fn next_sequence(&mut self, domain: Domain) -> Result<u64> {
        let bucket = self.bucket_mut(domain);
        let next = bucket.sequence.checked_add(1).ok_or_else(|| {
            Error::persistence(format!("{} sequence exhausted", domain))
        })?;
        bucket.sequence = next;
        Ok(next)
    }

    /// Total number of entries across all buckets
    pub fn len(&self) -> usize {
        self.0.values().map(|bucket| bucket.entries.len()).sum()
    }
}
