//! Declared-state reconcilers
//!
//! A reconciler owns the mutation contract of one domain. For every change it:
//! - Loads the previously declared value from the ConfigStore
//! - Removes the previous live effect if the declaration changed
//! - Applies the new declaration through the SystemAdapter
//! - Persists the new declaration
//!
//! ## Architecture
//!
//! ```text
//!            request
//!               │
//!               ▼
//!      ┌─────────────────┐      lock(domain, key)     ┌──────────┐
//!      │   Reconciler    │ ─────────────────────────▶ │ KeyLocks │
//!      └─────────────────┘                            └──────────┘
//!         │           │
//!  load / │           │ Remove(previous), then Apply(next)
//!  persist▼           ▼
//! ┌─────────────┐  ┌───────────────┐
//! │ ConfigStore │  │ SystemAdapter │
//! └─────────────┘  └───────────────┘
//! ```
//!
//! ## Persist-vs-Apply
//!
//! By default a declaration is persisted only after it was applied. A failed
//! apply returns [`Error::SystemApply`] and leaves the store as it was; when
//! the previous live state had already been removed it is re-applied so the
//! live system keeps matching the stored declaration.
//!
//! With `persist_on_apply_failure` the declaration is stored regardless and
//! the outcome carries [`ApplyStatus::ApplyFailed`].
//!
//! ## Cancellation
//!
//! The locked section of every mutation runs on its own task. Dropping the
//! caller's future (a disconnected client) does not stop a started
//! Remove/Apply/persist sequence; it runs to completion or timeout.

pub mod address;
pub mod singleton;

pub use address::AddressReconciler;
pub use singleton::{DhcpReconciler, DnsReconciler, GatewayReconciler};

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::locks::KeyLocks;
use crate::records::{
    AddressRecord, DhcpState, DnsConfig, DomainRecord, GatewayRecord, StoredRecord,
};
use crate::traits::{ConfigStore, SystemAdapter};

/// Whether a stored declaration is live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ApplyStatus {
    /// Applied to the live system
    Applied,
    /// Stored, but the live system could not be brought in line
    ApplyFailed(String),
}

/// Outcome of an accepted mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled<R> {
    /// The declaration as stored (with its id resolved)
    pub record: R,
    /// Live status of the declaration
    pub status: ApplyStatus,
}

impl<R> Reconciled<R> {
    fn applied(record: R) -> Self {
        Self {
            record,
            status: ApplyStatus::Applied,
        }
    }

    /// Whether the declaration is live
    pub fn is_applied(&self) -> bool {
        self.status == ApplyStatus::Applied
    }
}

/// The system adapters of all four domains
#[derive(Clone)]
pub struct Adapters {
    pub address: Arc<dyn SystemAdapter<AddressRecord>>,
    pub dhcp: Arc<dyn SystemAdapter<DhcpState>>,
    pub dns: Arc<dyn SystemAdapter<DnsConfig>>,
    pub gateway: Arc<dyn SystemAdapter<GatewayRecord>>,
}

/// All four reconcilers over one store
///
/// Cheap to clone; clones share the store, adapters and locks.
#[derive(Clone)]
pub struct Reconcilers {
    pub address: AddressReconciler,
    pub dhcp: DhcpReconciler,
    pub dns: DnsReconciler,
    pub gateway: GatewayReconciler,
}

impl Reconcilers {
    /// Build the reconcilers of every domain
    pub fn new(store: Arc<dyn ConfigStore>, adapters: Adapters, config: ReconcilerConfig) -> Self {
        let locks = Arc::new(KeyLocks::new());
        let shared = Shared {
            store,
            locks,
            config: Arc::new(config),
        };

        Self {
            address: AddressReconciler::new(Reconciler::new(shared.clone(), adapters.address)),
            dhcp: DhcpReconciler::new(Reconciler::new(shared.clone(), adapters.dhcp)),
            dns: DnsReconciler::new(Reconciler::new(shared.clone(), adapters.dns)),
            gateway: GatewayReconciler::new(Reconciler::new(shared, adapters.gateway)),
        }
    }
}

/// State shared by every domain's reconciler
#[derive(Clone)]
pub(crate) struct Shared {
    pub store: Arc<dyn ConfigStore>,
    pub locks: Arc<KeyLocks>,
    pub config: Arc<ReconcilerConfig>,
}

/// Domain-independent reconciliation skeleton
pub(crate) struct Reconciler<R: DomainRecord> {
    shared: Shared,
    adapter: Arc<dyn SystemAdapter<R>>,
}

impl<R: DomainRecord> Clone for Reconciler<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<R: DomainRecord> Reconciler<R> {
    pub fn new(shared: Shared, adapter: Arc<dyn SystemAdapter<R>>) -> Self {
        Self { shared, adapter }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.shared.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.shared.config
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.shared.locks
    }

    /// Load and decode the declaration stored under `key`
    pub async fn load(&self, key: &str) -> Result<Option<R>> {
        match self.shared.store.get(R::DOMAIN, key).await? {
            Some(value) => {
                let record = StoredRecord::<R>::decode(value)?;
                Ok(Some(record.keyed(key)))
            }
            None => Ok(None),
        }
    }

    /// Load every declaration of the domain, in store order
    ///
    /// Entries that no longer decode are skipped with a warning.
    pub async fn load_all(&self) -> Result<Vec<R>> {
        let entries = self.shared.store.list(R::DOMAIN).await?;
        let mut records = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match StoredRecord::<R>::decode(value) {
                Ok(record) => records.push(record.keyed(&key)),
                Err(e) => warn!("Skipping undecodable {} record '{}': {}", R::DOMAIN, key, e),
            }
        }
        Ok(records)
    }

    /// Read the live value through the adapter
    pub async fn read_live(&self) -> Result<Option<R>> {
        bounded(
            self.adapter.adapter_name(),
            "read",
            self.config().adapter_timeout(),
            self.adapter.read_live(),
        )
        .await
    }

    async fn apply(&self, record: &R) -> Result<()> {
        bounded(
            self.adapter.adapter_name(),
            "apply",
            self.config().adapter_timeout(),
            self.adapter.apply(record),
        )
        .await
    }

    async fn remove(&self, record: &R) -> Result<()> {
        bounded(
            self.adapter.adapter_name(),
            "remove",
            self.config().adapter_timeout(),
            self.adapter.remove(record),
        )
        .await
    }

    /// Move `key` from its `previous` declaration to `next`
    ///
    /// Must be called with the key's lock held. `create` stores with
    /// put-if-absent semantics.
    pub async fn transition(
        &self,
        key: &str,
        previous: Option<R>,
        next: R,
        create: bool,
    ) -> Result<Reconciled<R>> {
        let persist_anyway = self.config().persist_on_apply_failure;
        let mut failure: Option<Error> = None;
        let mut removed: Option<R> = None;

        match previous {
            Some(previous) if previous != next => {
                debug!("{} '{}' changed, removing previous declaration", R::DOMAIN, key);
                match self.remove(&previous).await {
                    Ok(()) => removed = Some(previous),
                    Err(e) if persist_anyway => {
                        warn!("Failed to remove previous {} '{}': {}", R::DOMAIN, key, e);
                        failure = Some(e);
                    }
                    Err(e) => {
                        error!("Failed to remove previous {} '{}': {}", R::DOMAIN, key, e);
                        return Err(e);
                    }
                }
            }
            Some(_) => debug!("{} '{}' unchanged, re-applying", R::DOMAIN, key),
            None => {}
        }

        if let Err(e) = self.apply(&next).await {
            error!("Failed to apply {} '{}': {}", R::DOMAIN, key, e);
            if !persist_anyway {
                if let Some(previous) = removed {
                    self.restore(key, &previous).await;
                }
                return Err(e);
            }
            failure = Some(e);
        }

        self.persist(key, &next, create).await?;

        match failure {
            None => {
                info!("{} '{}' reconciled", R::DOMAIN, key);
                Ok(Reconciled::applied(next))
            }
            Some(e) => {
                warn!("{} '{}' stored but not live: {}", R::DOMAIN, key, e);
                Ok(Reconciled {
                    record: next,
                    status: ApplyStatus::ApplyFailed(e.to_string()),
                })
            }
        }
    }

    /// Undo the live effect of the declaration under `key` and forget it
    ///
    /// Must be called with the key's lock held.
    pub async fn retire(&self, key: &str, previous: &R) -> Result<()> {
        if let Err(e) = self.remove(previous).await {
            error!("Failed to remove {} '{}': {}", R::DOMAIN, key, e);
            return Err(e);
        }
        self.shared.store.delete(R::DOMAIN, key).await?;
        info!("{} '{}' deleted", R::DOMAIN, key);
        Ok(())
    }

    /// Best-effort re-application of a declaration that is still stored
    async fn restore(&self, key: &str, previous: &R) {
        match self.apply(previous).await {
            Ok(()) => info!("Restored previous {} '{}'", R::DOMAIN, key),
            Err(e) => error!(
                "Failed to restore previous {} '{}', live state no longer matches the store: {}",
                R::DOMAIN,
                key,
                e
            ),
        }
    }

    async fn persist(&self, key: &str, record: &R, create: bool) -> Result<()> {
        let value = StoredRecord::encode(record)?;
        let stored = if create {
            self.shared.store.insert(R::DOMAIN, key, value).await
        } else {
            self.shared.store.put(R::DOMAIN, key, value).await
        };

        stored.map_err(|e| {
            error!(
                "Failed to persist {} '{}' (live change is not rolled back): {}",
                R::DOMAIN,
                key,
                e
            );
            e
        })
    }
}

/// Run a locked reconciliation on its own task and wait for it
///
/// The work keeps running if the returned future is dropped.
pub(crate) async fn detached<T, F>(work: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("Reconciliation task failed: {}", e);
        Error::other(format!("reconciliation task failed: {}", e))
    })?
}

/// Run one adapter call under the reconciler timeout
///
/// Any adapter failure surfaces as [`Error::SystemApply`].
pub(crate) async fn bounded<T, F>(
    adapter: &str,
    operation: &str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e @ Error::SystemApply { .. })) => Err(e),
        Ok(Err(e)) => Err(Error::system_apply(adapter, format!("{} failed: {}", operation, e))),
        Err(_) => Err(Error::system_apply(
            adapter,
            format!("{} timed out after {}s", operation, timeout.as_secs()),
        )),
    }
}
