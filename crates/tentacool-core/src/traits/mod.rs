//! Core traits for tentacool
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ConfigStore`]: Durable declared-state storage
//! - [`SystemAdapter`]: Apply/remove a record's effect on the live system
//! - [`NetworkInspector`]: Read-only live network view

pub mod config_store;
pub mod inspector;
pub mod system_adapter;

pub use config_store::ConfigStore;
pub use inspector::{InterfaceAddress, InterfaceInfo, NetworkInspector};
pub use system_adapter::{
    AddressAdapter, DhcpAdapter, DnsAdapter, GatewayAdapter, SystemAdapter,
};
