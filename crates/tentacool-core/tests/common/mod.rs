//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides recording adapters that stand in for the live
//! system, and a store whose writes can be made to fail.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tentacool_core::error::{Error, Result};
use tentacool_core::records::{AddressRecord, DhcpState, DnsConfig, Domain, GatewayRecord};
use tentacool_core::store::MemoryConfigStore;
use tentacool_core::traits::{ConfigStore, SystemAdapter};
use tentacool_core::{Adapters, DomainRecord, ReconcilerConfig, Reconcilers};

/// One adapter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call<R> {
    Apply(R),
    Remove(R),
}

/// Cross-domain log of adapter invocations, as "<op> <adapter>"
pub type Journal = Arc<Mutex<Vec<String>>>;

/// A SystemAdapter that records every call and fails on demand
pub struct RecordingAdapter<R> {
    name: &'static str,
    calls: Mutex<Vec<Call<R>>>,
    journal: Journal,
    failing_applies: Mutex<Vec<R>>,
    fail_every_apply: AtomicBool,
    fail_remove: AtomicBool,
    delay: Mutex<Option<Duration>>,
    live: Mutex<Option<R>>,
}

impl<R: DomainRecord> RecordingAdapter<R> {
    pub fn new(name: &'static str, journal: Journal) -> Self {
        Self {
            name,
            calls: Mutex::new(Vec::new()),
            journal,
            failing_applies: Mutex::new(Vec::new()),
            fail_every_apply: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            delay: Mutex::new(None),
            live: Mutex::new(None),
        }
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call<R>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn apply_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Apply(_)))
            .count()
    }

    pub fn remove_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Remove(_)))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make `apply` fail for this exact record
    pub fn fail_apply_of(&self, record: R) {
        self.failing_applies.lock().unwrap().push(record);
    }

    /// Make every `apply` fail
    pub fn fail_every_apply(&self, fail: bool) {
        self.fail_every_apply.store(fail, Ordering::SeqCst);
    }

    /// Make every `remove` fail
    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Make every call take this long
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Value returned by `read_live`
    pub fn set_live(&self, record: R) {
        *self.live.lock().unwrap() = Some(record);
    }

    async fn record(&self, op: &str, call: Call<R>) {
        self.calls.lock().unwrap().push(call);
        self.journal
            .lock()
            .unwrap()
            .push(format!("{} {}", op, self.name));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl<R: DomainRecord> SystemAdapter<R> for RecordingAdapter<R> {
    async fn apply(&self, record: &R) -> Result<()> {
        self.record("apply", Call::Apply(record.clone())).await;

        let listed = self.failing_applies.lock().unwrap().contains(record);
        if listed || self.fail_every_apply.load(Ordering::SeqCst) {
            return Err(Error::system_apply(self.name, "injected apply failure"));
        }
        Ok(())
    }

    async fn remove(&self, record: &R) -> Result<()> {
        self.record("remove", Call::Remove(record.clone())).await;

        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Error::Other("injected remove failure".to_string()));
        }
        Ok(())
    }

    async fn read_live(&self) -> Result<Option<R>> {
        Ok(self.live.lock().unwrap().clone())
    }

    fn adapter_name(&self) -> &'static str {
        self.name
    }
}

/// Recording adapters for all four domains, sharing one journal
pub struct Fakes {
    pub journal: Journal,
    pub address: Arc<RecordingAdapter<AddressRecord>>,
    pub dhcp: Arc<RecordingAdapter<DhcpState>>,
    pub dns: Arc<RecordingAdapter<DnsConfig>>,
    pub gateway: Arc<RecordingAdapter<GatewayRecord>>,
}

impl Fakes {
    pub fn new() -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        Self {
            address: Arc::new(RecordingAdapter::new("address", journal.clone())),
            dhcp: Arc::new(RecordingAdapter::new("dhcp", journal.clone())),
            dns: Arc::new(RecordingAdapter::new("dns", journal.clone())),
            gateway: Arc::new(RecordingAdapter::new("gateway", journal.clone())),
            journal,
        }
    }

    pub fn adapters(&self) -> Adapters {
        Adapters {
            address: self.address.clone(),
            dhcp: self.dhcp.clone(),
            dns: self.dns.clone(),
            gateway: self.gateway.clone(),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

/// Reconcilers over `store` with recording adapters
pub fn reconcilers_with(
    store: Arc<dyn ConfigStore>,
    config: ReconcilerConfig,
) -> (Reconcilers, Fakes) {
    let fakes = Fakes::new();
    let reconcilers = Reconcilers::new(store, fakes.adapters(), config);
    (reconcilers, fakes)
}

/// Reconcilers over a fresh memory store, default config
pub fn reconcilers() -> (Reconcilers, Fakes, Arc<MemoryConfigStore>) {
    let store = Arc::new(MemoryConfigStore::new());
    let (reconcilers, fakes) = reconcilers_with(store.clone(), ReconcilerConfig::default());
    (reconcilers, fakes, store)
}

/// A memory store whose writes fail while `fail_writes` is set
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryConfigStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::persistence("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigStore for FailingStore {
    async fn get(&self, domain: Domain, key: &str) -> Result<Option<serde_json::Value>> {
        self.inner.get(domain, key).await
    }

    async fn list(&self, domain: Domain) -> Result<Vec<(String, serde_json::Value)>> {
        self.inner.list(domain).await
    }

    async fn put(&self, domain: Domain, key: &str, value: serde_json::Value) -> Result<()> {
        self.check()?;
        self.inner.put(domain, key, value).await
    }

    async fn insert(&self, domain: Domain, key: &str, value: serde_json::Value) -> Result<()> {
        self.check()?;
        self.inner.insert(domain, key, value).await
    }

    async fn delete(&self, domain: Domain, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(domain, key).await
    }

    async fn next_sequence(&self, domain: Domain) -> Result<u64> {
        self.check()?;
        self.inner.next_sequence(domain).await
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub fn lan(ip: &str) -> AddressRecord {
    AddressRecord::new("", "eth0", ip)
}
