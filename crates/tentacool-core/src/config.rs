//! Configuration types for tentacool
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::records::dhcp::DEFAULT_DHCP_INTERFACE;

/// Default location of the persistent store
pub const DEFAULT_DB_PATH: &str = "/var/lib/tentacool/db";

/// Main tentacool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TentacoolConfig {
    /// Config store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Reconciler settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl TentacoolConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.reconciler.validate()?;
        Ok(())
    }
}

/// Config store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based store
    File {
        /// Path to the store file
        path: PathBuf,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Store path cannot be empty"));
                }
                if path.is_dir() {
                    return Err(crate::Error::config(format!(
                        "Store path {} is a directory",
                        path.display()
                    )));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Upper bound on a single adapter call (in seconds)
    ///
    /// An adapter call that runs longer is abandoned and reported as an
    /// apply failure.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,

    /// Store a declaration even when applying it to the live system failed
    ///
    /// Off by default: the declaration is only written once it is live. When
    /// on, the write happens regardless and the outcome reports the apply
    /// failure.
    #[serde(default)]
    pub persist_on_apply_failure: bool,

    /// Interface used for DHCP when none is given
    #[serde(default = "default_dhcp_interface")]
    pub default_dhcp_interface: String,
}

impl ReconcilerConfig {
    /// Validate the reconciler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.adapter_timeout_secs == 0 {
            return Err(crate::Error::config("Adapter timeout must be > 0"));
        }
        if self.default_dhcp_interface.is_empty() {
            return Err(crate::Error::config(
                "Default DHCP interface cannot be empty",
            ));
        }
        Ok(())
    }

    /// Adapter timeout as a duration
    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.adapter_timeout_secs)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_adapter_timeout_secs(),
            persist_on_apply_failure: false,
            default_dhcp_interface: default_dhcp_interface(),
        }
    }
}

fn default_adapter_timeout_secs() -> u64 {
    30
}

fn default_dhcp_interface() -> String {
    DEFAULT_DHCP_INTERFACE.to_string()
}
