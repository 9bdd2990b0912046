//! Default gateway (singleton)

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::{Domain, DomainRecord, SingletonRecord, validate_link_name};
use crate::error::{Error, Result};

/// Declared default route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    /// Next-hop address
    #[serde(default)]
    pub ip: String,
    /// Outgoing interface, empty to let the kernel pick
    #[serde(default)]
    pub link: String,
}

impl GatewayRecord {
    /// Create a new gateway record
    pub fn new(ip: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            link: link.into(),
        }
    }

    /// Parsed next-hop address
    pub fn next_hop(&self) -> Result<IpAddr> {
        self.ip
            .parse()
            .map_err(|_| Error::validation(format!("gateway '{}' is not an IP address", self.ip)))
    }
}

impl DomainRecord for GatewayRecord {
    const DOMAIN: Domain = Domain::Gateway;

    fn validate(&self) -> Result<()> {
        if self.ip.is_empty() {
            return Err(Error::validation("ip is empty"));
        }
        self.next_hop()?;
        if !self.link.is_empty() {
            validate_link_name("link", &self.link)?;
        }
        Ok(())
    }
}

impl SingletonRecord for GatewayRecord {
    const KEY: &'static str = "default";
}
