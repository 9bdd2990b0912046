//! Per-domain id allocation on top of the config store sequence

use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::records::Domain;
use crate::traits::ConfigStore;

/// Hands out decimal record ids
///
/// Ids come from [`ConfigStore::next_sequence`], so they are unique for the
/// lifetime of the bucket even across restarts and concurrent callers.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn ConfigStore>,
}

impl SequenceAllocator {
    /// Create an allocator over `store`
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Next id of `domain`, as a base-10 string
    pub async fn next_id(&self, domain: Domain) -> Result<String> {
        let value = self.store.next_sequence(domain).await?;
        Ok(value.to_string())
    }

    /// Next id of `domain` not already used as a key
    ///
    /// A numeric key can exist without having been allocated (the `--setip`
    /// bootstrap path accepts any id), so allocated values are skipped until
    /// a free one turns up.
    pub async fn next_free_id(&self, domain: Domain) -> Result<String> {
        loop {
            let id = self.next_id(domain).await?;
            if self.store.get(domain, &id).await?.is_none() {
                return Ok(id);
            }
            debug!("Skipping {} id {}, already in use", domain, id);
        }
    }
}

impl std::fmt::Debug for SequenceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceAllocator").finish_non_exhaustive()
    }
}
