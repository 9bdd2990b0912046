//! Command-line flags
//!
//! Every flag can also be set through its `TENTACOOL_*` environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use tentacool_api::BindAddr;
use tentacool_core::config::DEFAULT_DB_PATH;
use tentacool_core::{AddressRecord, ReconcilerConfig, StoreConfig, TentacoolConfig};
use tentacool_linux::LinuxConfig;

#[derive(Debug, Parser)]
#[command(name = "tentacoold")]
#[command(version, about = "Declared network configuration over a REST API")]
pub struct Cli {
    /// Unix socket path or IP:PORT to listen on
    #[arg(long, env = "TENTACOOL_BIND", default_value = "/var/run/tentacool")]
    pub bind: String,

    /// Path of the configuration database
    #[arg(long, env = "TENTACOOL_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Owner of the unix socket
    #[arg(long, env = "TENTACOOL_OWNER")]
    pub owner: Option<String>,

    /// Group of the unix socket, name or gid (defaults to the owner's group)
    #[arg(long, env = "TENTACOOL_GROUP")]
    pub group: Option<String>,

    /// Octal permissions of the unix socket
    #[arg(long, env = "TENTACOOL_MODE", default_value = "0660")]
    pub mode: String,

    /// Set one address as ID:LINK:CIDR and exit without serving
    #[arg(long, env = "TENTACOOL_SETIP", value_name = "ID:LINK:CIDR")]
    pub setip: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long, env = "TENTACOOL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds a single system change may take
    #[arg(long, env = "TENTACOOL_ADAPTER_TIMEOUT_SECS", default_value_t = 30)]
    pub adapter_timeout_secs: u64,

    /// Keep declarations even when they could not be applied
    #[arg(long, env = "TENTACOOL_PERSIST_ON_APPLY_FAILURE")]
    pub persist_on_apply_failure: bool,

    #[arg(long, env = "TENTACOOL_RESOLV_CONF", default_value = "/etc/resolv.conf")]
    pub resolv_conf: PathBuf,

    #[arg(long, env = "TENTACOOL_DHCLIENT", default_value = "/sbin/dhclient")]
    pub dhclient: PathBuf,

    /// iproute2 `ip` binary
    #[arg(long, env = "TENTACOOL_IP_BIN", default_value = "ip")]
    pub ip_bin: PathBuf,
}

impl Cli {
    /// Validate flags that clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.log_level()?;
        self.bind_addr()?;
        self.socket_mode()?;
        if let Some(setip) = &self.setip {
            AddressRecord::parse_triplet(setip)
                .with_context(|| format!("--setip '{}' is not ID:LINK:CIDR", setip))?;
        }
        self.core_config().validate()?;
        self.linux_config().validate()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "--log-level '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    pub fn bind_addr(&self) -> Result<BindAddr> {
        self.bind
            .parse()
            .map_err(|e: String| anyhow::anyhow!("--bind: {}", e))
    }

    /// Socket permissions parsed from octal
    pub fn socket_mode(&self) -> Result<u32> {
        let mode = u32::from_str_radix(self.mode.trim_start_matches("0o"), 8)
            .with_context(|| format!("--mode '{}' is not an octal mode", self.mode))?;
        if mode > 0o7777 {
            anyhow::bail!("--mode '{}' is out of range", self.mode);
        }
        Ok(mode)
    }

    pub fn core_config(&self) -> TentacoolConfig {
        TentacoolConfig {
            store: StoreConfig::File {
                path: self.db.clone(),
            },
            reconciler: ReconcilerConfig {
                adapter_timeout_secs: self.adapter_timeout_secs,
                persist_on_apply_failure: self.persist_on_apply_failure,
                ..Default::default()
            },
        }
    }

    pub fn linux_config(&self) -> LinuxConfig {
        LinuxConfig {
            ip_bin: self.ip_bin.clone(),
            dhclient: self.dhclient.clone(),
            resolv_conf: self.resolv_conf.clone(),
            ..Default::default()
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }
}
