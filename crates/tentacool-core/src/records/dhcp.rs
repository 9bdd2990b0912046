//! DHCP client activation state (singleton)

use serde::{Deserialize, Serialize};

use super::{Domain, DomainRecord, SingletonRecord, validate_link_name};
use crate::error::Result;

/// Default interface the DHCP client runs on
pub const DEFAULT_DHCP_INTERFACE: &str = "eth0";

/// Whether a DHCP client should run, and on which interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpState {
    /// Client running
    #[serde(default)]
    pub active: bool,
    /// Interface the client manages
    #[serde(default)]
    pub interface: String,
}

impl DhcpState {
    /// Create a new DHCP state
    pub fn new(active: bool, interface: impl Into<String>) -> Self {
        Self {
            active,
            interface: interface.into(),
        }
    }

    /// State reported when nothing was ever declared
    pub fn inactive(interface: impl Into<String>) -> Self {
        Self::new(false, interface)
    }

    /// Fill an empty interface with the given default
    pub fn with_default_interface(mut self, default: &str) -> Self {
        if self.interface.is_empty() {
            self.interface = default.to_string();
        }
        self
    }
}

impl DomainRecord for DhcpState {
    const DOMAIN: Domain = Domain::Dhcp;

    fn validate(&self) -> Result<()> {
        validate_link_name("interface", &self.interface)
    }
}

impl SingletonRecord for DhcpState {
    const KEY: &'static str = "active";
}
