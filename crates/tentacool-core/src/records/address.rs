// # Address Record
//
// An address bound to a link, keyed by id. Ids are either chosen by the
// caller (any non-numeric string) or allocated from the domain sequence
// (decimal strings). The numeric namespace is reserved for allocation so
// the two can never collide.

use serde::{Deserialize, Serialize};

use super::{Cidr, Domain, DomainRecord, validate_link_name};
use crate::error::{Error, Result};

/// A declared interface address
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Record id, empty on create to request allocation
    #[serde(default)]
    pub id: String,
    /// Interface name (e.g. "eth0")
    #[serde(default)]
    pub link: String,
    /// Address in CIDR notation (e.g. "192.168.1.10/24")
    #[serde(default)]
    pub ip: String,
}

impl AddressRecord {
    /// Create a new address record
    pub fn new(id: impl Into<String>, link: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: link.into(),
            ip: ip.into(),
        }
    }

    /// Copy of this record with a different id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Parsed CIDR of this record
    pub fn cidr(&self) -> Result<Cidr> {
        self.ip.parse()
    }

    /// Parse the `id:link:cidr` form used on the command line
    pub fn parse_triplet(triplet: &str) -> Result<Self> {
        // IPv6 CIDRs contain ':' so only the first two separators count
        let mut parts = triplet.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(link), Some(ip)) if !id.is_empty() => {
                let record = Self::new(id, link, ip);
                record.validate()?;
                Ok(record)
            }
            _ => Err(Error::validation(format!(
                "expected ID:LINK:CIDR, got '{}'",
                triplet
            ))),
        }
    }
}

/// Whether an id lives in the namespace reserved for allocated ids
pub fn is_reserved_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && id.parse::<u64>().is_ok()
}

impl DomainRecord for AddressRecord {
    const DOMAIN: Domain = Domain::Address;

    fn validate(&self) -> Result<()> {
        validate_link_name("link", &self.link)?;
        if self.ip.is_empty() {
            return Err(Error::validation("ip is empty"));
        }
        self.cidr()?;
        Ok(())
    }

    fn keyed(self, key: &str) -> Self {
        self.with_id(key)
    }
}
