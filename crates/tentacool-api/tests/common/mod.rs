// Test doubles for API tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use tentacool_api::{AppState, app};
use tentacool_core::records::{AddressRecord, DhcpState, DnsConfig, DomainRecord, GatewayRecord};
use tentacool_core::traits::{InterfaceAddress, InterfaceInfo, NetworkInspector, SystemAdapter};
use tentacool_core::{
    Adapters, ConfigStore, Error, MemoryConfigStore, ReconcilerConfig, Reconcilers, Result,
};

/// Adapter that counts calls and fails on demand
pub struct FakeAdapter<R> {
    name: &'static str,
    applied: Mutex<Vec<R>>,
    removed: AtomicUsize,
    fail_apply: AtomicBool,
}

impl<R> FakeAdapter<R> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            applied: Mutex::new(Vec::new()),
            removed: AtomicUsize::new(0),
            fail_apply: AtomicBool::new(false),
        }
    }

    pub fn fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

impl<R: Clone> FakeAdapter<R> {
    pub fn applied(&self) -> Vec<R> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl<R: DomainRecord> SystemAdapter<R> for FakeAdapter<R> {
    async fn apply(&self, record: &R) -> Result<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(Error::system_apply(self.name, "injected failure"));
        }
        self.applied.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn remove(&self, _record: &R) -> Result<()> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn adapter_name(&self) -> &'static str {
        self.name
    }
}

/// Inspector with a fixed view of one interface
pub struct FakeInspector;

#[async_trait]
impl NetworkInspector for FakeInspector {
    async fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        Ok(vec![InterfaceInfo {
            name: "eth0".into(),
            hardware_addr: "52:54:00:12:34:56".into(),
            mtu: 1500,
        }])
    }

    async fn interface_addresses(&self, name: &str) -> Result<Vec<InterfaceAddress>> {
        if name != "eth0" {
            return Err(Error::not_found(format!("interface {} not found", name)));
        }
        Ok(vec![InterfaceAddress {
            ip: "192.168.1.10".into(),
            mask: "ffffff00".into(),
        }])
    }

    async fn routes(&self) -> Result<Vec<Value>> {
        Ok(vec![serde_json::json!({
            "dst": "default",
            "gateway": "192.168.1.1",
            "dev": "eth0",
        })])
    }
}

pub struct Fakes {
    pub address: Arc<FakeAdapter<AddressRecord>>,
    pub dhcp: Arc<FakeAdapter<DhcpState>>,
    pub dns: Arc<FakeAdapter<DnsConfig>>,
    pub gateway: Arc<FakeAdapter<GatewayRecord>>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            address: Arc::new(FakeAdapter::new("address")),
            dhcp: Arc::new(FakeAdapter::new("dhcp")),
            dns: Arc::new(FakeAdapter::new("dns")),
            gateway: Arc::new(FakeAdapter::new("gateway")),
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
}

/// Router over `store` with fresh fakes
pub fn router_with(store: Arc<dyn ConfigStore>, config: ReconcilerConfig) -> (Router, Fakes) {
    let fakes = Fakes::new();
    let reconcilers = Reconcilers::new(store, fakes.adapters(), config);
    let router = app(AppState::new(reconcilers, Arc::new(FakeInspector)));
    (router, fakes)
}

/// Router over an in-memory store
pub fn router() -> (Router, Fakes) {
    router_with(
        Arc::new(MemoryConfigStore::new()),
        ReconcilerConfig::default(),
    )
}

/// Send one request and decode the JSON response
pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
