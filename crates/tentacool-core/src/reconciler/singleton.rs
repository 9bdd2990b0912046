//! Singleton domains: DHCP, DNS and the default gateway
//!
//! Each has exactly one declaration under a fixed key, replaced by `set` and
//! never deleted.

use super::{Reconciled, Reconciler, detached};
use crate::error::{Error, Result};
use crate::records::{DhcpState, DnsConfig, GatewayRecord, SingletonRecord};

impl<R: SingletonRecord> Reconciler<R> {
    /// Replace the singleton declaration
    async fn set(&self, record: R) -> Result<Reconciled<R>> {
        record.validate()?;

        let this = self.clone();
        detached(async move {
            let _guard = this.locks().lock(R::DOMAIN, R::KEY).await;
            let previous = this.load(R::KEY).await?;
            this.transition(R::KEY, previous, record, false).await
        })
        .await
    }

    async fn stored(&self) -> Result<Option<R>> {
        self.load(R::KEY).await
    }
}

/// DHCP client activation
#[derive(Clone)]
pub struct DhcpReconciler {
    inner: Reconciler<DhcpState>,
}

impl DhcpReconciler {
    pub(crate) fn new(inner: Reconciler<DhcpState>) -> Self {
        Self { inner }
    }

    /// Declared DHCP state, inactive on the default interface if never set
    pub async fn get(&self) -> Result<DhcpState> {
        let default_interface = &self.inner.config().default_dhcp_interface;
        Ok(self
            .inner
            .stored()
            .await?
            .map(|state| state.with_default_interface(default_interface))
            .unwrap_or_else(|| DhcpState::inactive(default_interface.as_str())))
    }

    /// Start or stop the DHCP client
    ///
    /// Moving an active client to another interface stops it on the old one
    /// first.
    pub async fn set(&self, state: DhcpState) -> Result<Reconciled<DhcpState>> {
        let state = state.with_default_interface(&self.inner.config().default_dhcp_interface);
        self.inner.set(state).await
    }
}

/// Resolver configuration
#[derive(Clone)]
pub struct DnsReconciler {
    inner: Reconciler<DnsConfig>,
}

impl DnsReconciler {
    pub(crate) fn new(inner: Reconciler<DnsConfig>) -> Self {
        Self { inner }
    }

    /// Declared resolver configuration, or the live one if none was declared
    pub async fn get(&self) -> Result<DnsConfig> {
        if let Some(config) = self.inner.stored().await? {
            return Ok(config);
        }
        Ok(self.inner.read_live().await?.unwrap_or_default())
    }

    /// Rewrite the resolver configuration
    pub async fn set(&self, config: DnsConfig) -> Result<Reconciled<DnsConfig>> {
        self.inner.set(config).await
    }
}

/// Default route
#[derive(Clone)]
pub struct GatewayReconciler {
    inner: Reconciler<GatewayRecord>,
}

impl GatewayReconciler {
    pub(crate) fn new(inner: Reconciler<GatewayRecord>) -> Self {
        Self { inner }
    }

    /// Declared default gateway
    pub async fn get(&self) -> Result<GatewayRecord> {
        self.inner
            .stored()
            .await?
            .ok_or_else(|| Error::not_found("no default gateway declared"))
    }

    /// Replace the default route
    pub async fn set(&self, gateway: GatewayRecord) -> Result<Reconciled<GatewayRecord>> {
        self.inner.set(gateway).await
    }
}
