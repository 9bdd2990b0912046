// # DNS Resolver Configuration
//
// The resolver settings tentacool declares (singleton). Field set mirrors
// what resolv.conf can express: nameservers, search list and the
// `ndots`/`timeout`/`attempts`/`rotate` options. Zero means "unset".

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::{Domain, DomainRecord, SingletonRecord};
use crate::error::{Error, Result};

/// Declared resolver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Nameservers, in query order
    #[serde(default)]
    pub servers: Vec<String>,
    /// Search domains, in order
    #[serde(default)]
    pub search: Vec<String>,
    /// Dots in a name before an absolute lookup is tried first
    #[serde(default)]
    pub ndots: u32,
    /// Seconds to wait for a server
    #[serde(default)]
    pub timeout: u32,
    /// Attempts per server before giving up
    #[serde(default, alias = "attemps")]
    pub attempts: u32,
    /// Round robin among servers
    #[serde(default)]
    pub rotate: bool,
}

impl DnsConfig {
    /// Create a configuration with servers and search domains only
    pub fn new(servers: Vec<String>, search: Vec<String>) -> Self {
        Self {
            servers,
            search,
            ..Self::default()
        }
    }

    /// Whether any `options` line is needed
    pub fn has_options(&self) -> bool {
        self.ndots != 0 || self.timeout != 0 || self.attempts != 0 || self.rotate
    }
}

impl DomainRecord for DnsConfig {
    const DOMAIN: Domain = Domain::Dns;

    fn validate(&self) -> Result<()> {
        for server in &self.servers {
            server.parse::<IpAddr>().map_err(|_| {
                Error::validation(format!("nameserver '{}' is not an IP address", server))
            })?;
        }
        for domain in &self.search {
            if domain.is_empty() || domain.chars().any(char::is_whitespace) {
                return Err(Error::validation(format!(
                    "search domain '{}' is not valid",
                    domain
                )));
            }
        }
        Ok(())
    }
}

impl SingletonRecord for DnsConfig {
    const KEY: &'static str = "dns";
}
