// # Network Inspector Trait
//
// Read-only view of live networking state, backing the informational
// endpoints (`/interfaces`, `/routes`). Nothing here is declared or
// persisted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A live network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface name
    #[serde(rename = "link")]
    pub name: String,
    /// MAC address, empty for interfaces without one
    #[serde(rename = "hardwareaddr")]
    pub hardware_addr: String,
    /// Maximum transmission unit
    pub mtu: u32,
}

/// A live address on an interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    /// Address without prefix
    pub ip: String,
    /// Netmask as hex, `ffffff00` for a /24
    pub mask: String,
}

/// Trait for live network observers
///
/// # Trust Level: Semi-Trusted
///
/// Inspectors may read kernel state (netlink, sysfs, `ip -j`) but never
/// change it.
#[async_trait]
pub trait NetworkInspector: Send + Sync {
    /// List all interfaces
    async fn interfaces(&self) -> Result<Vec<InterfaceInfo>, crate::Error>;

    /// List addresses assigned to one interface
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)`: No such interface
    async fn interface_addresses(&self, name: &str) -> Result<Vec<InterfaceAddress>, crate::Error>;

    /// Dump the routing table
    ///
    /// Entries are passed through as the platform reports them.
    async fn routes(&self) -> Result<Vec<serde_json::Value>, crate::Error>;
}
