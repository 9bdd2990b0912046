//! Declared-state record types
//!
//! One record type per configuration domain, plus the [`StoredRecord`]
//! envelope every value is wrapped in before it reaches the config store.
//!
//! ## Persisted Format
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "domain": "address",
//!   "updated_at": "2025-01-09T12:00:00Z",
//!   "record": { "id": "1", "link": "eth0", "ip": "192.168.1.10/24" }
//! }
//! ```
//!
//! Bare record JSON (no envelope) is still accepted on read.

pub mod address;
pub mod cidr;
pub mod dhcp;
pub mod dns;
pub mod gateway;

pub use address::AddressRecord;
pub use cidr::Cidr;
pub use dhcp::DhcpState;
pub use dns::DnsConfig;
pub use gateway::GatewayRecord;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Current envelope schema version
pub const SCHEMA_VERSION: u32 = 1;

/// The four fixed configuration domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Address,
    Dhcp,
    Dns,
    Gateway,
}

impl Domain {
    /// All domains, in startup replay order
    ///
    /// DHCP first (it may bring up a link), gateway last (it needs an
    /// address on the link to be reachable).
    pub const REPLAY_ORDER: [Domain; 4] = [
        Domain::Dhcp,
        Domain::Address,
        Domain::Dns,
        Domain::Gateway,
    ];

    /// Name of the store bucket holding this domain
    pub fn bucket(&self) -> &'static str {
        match self {
            Domain::Address => "address",
            Domain::Dhcp => "dhcp",
            Domain::Dns => "dns",
            Domain::Gateway => "routes",
        }
    }

    /// Fixed key for singleton domains, `None` for keyed domains
    pub fn singleton_key(&self) -> Option<&'static str> {
        match self {
            Domain::Address => None,
            Domain::Dhcp => Some("active"),
            Domain::Dns => Some("dns"),
            Domain::Gateway => Some("default"),
        }
    }

    /// Look a domain up by bucket name
    pub fn from_bucket(bucket: &str) -> Option<Self> {
        Self::REPLAY_ORDER
            .into_iter()
            .find(|domain| domain.bucket() == bucket)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Address => "address",
            Domain::Dhcp => "dhcp",
            Domain::Dns => "dns",
            Domain::Gateway => "gateway",
        };
        f.write_str(name)
    }
}

/// A record that belongs to exactly one domain
pub trait DomainRecord:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Domain this record type is stored under
    const DOMAIN: Domain;

    /// Check field-level invariants
    fn validate(&self) -> Result<()>;

    /// The record as stored under `key`
    ///
    /// Keyed domains take their identity from the store key, not from the
    /// decoded value.
    fn keyed(self, _key: &str) -> Self {
        self
    }
}

/// A record stored under one fixed key of its domain
pub trait SingletonRecord: DomainRecord {
    /// The only key this record is stored under
    const KEY: &'static str;
}

/// Versioned envelope around a persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<R> {
    /// Envelope schema version
    pub schema_version: u32,
    /// Bucket name the record belongs to
    pub domain: String,
    /// When this declaration was written
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// The declared record
    pub record: R,
}

impl<R: DomainRecord> StoredRecord<R> {
    /// Wrap a record in a fresh envelope
    pub fn new(record: R) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            domain: R::DOMAIN.bucket().to_string(),
            updated_at: chrono::Utc::now(),
            record,
        }
    }

    /// Encode a record for the config store
    pub fn encode(record: &R) -> Result<serde_json::Value> {
        serde_json::to_value(Self::new(record.clone()))
            .map_err(|e| Error::persistence(format!("Failed to encode {} record: {}", R::DOMAIN, e)))
    }

    /// Decode a stored value, accepting both enveloped and bare records
    pub fn decode(value: serde_json::Value) -> Result<R> {
        let enveloped = value
            .as_object()
            .is_some_and(|obj| obj.contains_key("schema_version") && obj.contains_key("record"));

        if !enveloped {
            return serde_json::from_value(value).map_err(|e| {
                Error::persistence(format!("Failed to decode legacy {} record: {}", R::DOMAIN, e))
            });
        }

        let stored: StoredRecord<R> = serde_json::from_value(value).map_err(|e| {
            Error::persistence(format!("Failed to decode {} record: {}", R::DOMAIN, e))
        })?;

        if stored.schema_version > SCHEMA_VERSION {
            return Err(Error::persistence(format!(
                "{} record has schema version {}, newest supported is {}",
                R::DOMAIN,
                stored.schema_version,
                SCHEMA_VERSION
            )));
        }
        if stored.domain != R::DOMAIN.bucket() {
            return Err(Error::persistence(format!(
                "record tagged for bucket '{}' found in bucket '{}'",
                stored.domain,
                R::DOMAIN.bucket()
            )));
        }

        Ok(stored.record)
    }
}

/// Check an interface name the way the kernel would accept it
pub(crate) fn validate_link_name(field: &str, link: &str) -> Result<()> {
    if link.is_empty() {
        return Err(Error::validation(format!("{} is empty", field)));
    }
    // IFNAMSIZ is 16 including the trailing NUL
    if link.len() > 15 {
        return Err(Error::validation(format!(
            "{} '{}' is longer than 15 bytes",
            field, link
        )));
    }
    if link.chars().any(|c| c.is_whitespace() || c == '/' || c == ':') {
        return Err(Error::validation(format!(
            "{} '{}' contains invalid characters",
            field, link
        )));
    }
    Ok(())
}
