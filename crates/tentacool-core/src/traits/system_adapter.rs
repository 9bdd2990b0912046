// # System Adapter Trait
//
// Defines the interface for driving live networking state.
//
// ## Implementations
//
// - Linux: `tentacool-linux` crate (iproute2, dhclient, resolv.conf)
// - Tests: recording fakes in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use tentacool_core::{AddressRecord, SystemAdapter};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let adapter = /* SystemAdapter<AddressRecord> implementation */;
//
//     let record = AddressRecord::new("1", "eth0", "192.168.1.10/24");
//     adapter.apply(&record).await?;
//     adapter.remove(&record).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::records::{AddressRecord, DhcpState, DnsConfig, DomainRecord, GatewayRecord};

/// Trait for live-system adapters, one implementation per domain
///
/// # Trust Level: Untrusted
///
/// Adapters execute side effects against the kernel or external programs
/// and can hang or fail at any time.
///
/// ## Allowed Capabilities
/// - ✅ Run netlink calls or subprocesses affecting the given record only
/// - ✅ Read live system state for [`SystemAdapter::read_live`]
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Access the config store (owned by reconcilers)
/// - ❌ Retry or sleep (reconcilers bound every call with a timeout)
/// - ❌ Remember previous records (the reconciler passes the exact record to
///   remove)
///
/// # Idempotency
///
/// `apply` of a record whose effect is already live must succeed (an address
/// already assigned, a default route already present, a DHCP client already
/// running). `remove` of a record whose effect is already gone must succeed.
///
/// # Cancellation
///
/// The reconciler drops the future when its timeout elapses. Implementations
/// that spawn processes must make sure the child dies with the future
/// (e.g. `kill_on_drop(true)`).
#[async_trait]
pub trait SystemAdapter<R: DomainRecord>: Send + Sync {
    /// Make the record's effect live
    async fn apply(&self, record: &R) -> Result<(), crate::Error>;

    /// Undo exactly the effect `apply` had for this record
    ///
    /// Domains whose apply fully replaces previous content (DNS) implement
    /// this as a no-op.
    async fn remove(&self, record: &R) -> Result<(), crate::Error>;

    /// Read the live value, for domains that can report one
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The live configuration
    /// - `Ok(None)`: This adapter cannot observe live state
    async fn read_live(&self) -> Result<Option<R>, crate::Error> {
        Ok(None)
    }

    /// Adapter name (for logging and error reports)
    fn adapter_name(&self) -> &'static str;
}

/// Address domain adapter
pub type AddressAdapter = dyn SystemAdapter<AddressRecord>;
/// DHCP domain adapter
pub type DhcpAdapter = dyn SystemAdapter<DhcpState>;
/// DNS domain adapter
pub type DnsAdapter = dyn SystemAdapter<DnsConfig>;
/// Gateway domain adapter
pub type GatewayAdapter = dyn SystemAdapter<GatewayRecord>;
