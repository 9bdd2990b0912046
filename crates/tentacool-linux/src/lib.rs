// # tentacool-linux
//
// System adapters that drive a Linux host.
//
// ## Backends
//
// | Domain  | Adapter             | Tool                          |
// |---------|---------------------|-------------------------------|
// | address | `IpAddressAdapter`  | `ip addr`                     |
// | dhcp    | `DhclientAdapter`   | `dhclient`                    |
// | dns     | `ResolvConfAdapter` | resolv.conf / `resolvconf -u` |
// | gateway | `IpGatewayAdapter`  | `ip route`                    |
//
// `IpInspector` backs the read-only interface and route views.

pub mod address;
pub mod command;
pub mod dhcp;
pub mod gateway;
pub mod inspector;
pub mod resolv;

pub use address::IpAddressAdapter;
pub use dhcp::DhclientAdapter;
pub use gateway::IpGatewayAdapter;
pub use inspector::IpInspector;
pub use resolv::ResolvConfAdapter;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use tentacool_core::{Adapters, Error, Result};

/// Paths of the tools and files the adapters use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinuxConfig {
    /// iproute2 `ip` binary
    #[serde(default = "default_ip_bin")]
    pub ip_bin: PathBuf,

    /// ISC dhclient binary
    #[serde(default = "default_dhclient")]
    pub dhclient: PathBuf,

    /// Directory for dhclient pid files
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,

    #[serde(default = "default_resolv_conf")]
    pub resolv_conf: PathBuf,

    /// Written instead of resolv.conf when resolvconf manages it
    #[serde(default = "default_resolvconf_base")]
    pub resolvconf_base: PathBuf,

    #[serde(default = "default_resolvconf")]
    pub resolvconf: PathBuf,
}

fn default_ip_bin() -> PathBuf {
    PathBuf::from("ip")
}

fn default_dhclient() -> PathBuf {
    PathBuf::from("/sbin/dhclient")
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/run")
}

fn default_resolv_conf() -> PathBuf {
    PathBuf::from("/etc/resolv.conf")
}

fn default_resolvconf_base() -> PathBuf {
    PathBuf::from("/etc/resolvconf/resolv.conf.d/base")
}

fn default_resolvconf() -> PathBuf {
    PathBuf::from("resolvconf")
}

impl Default for LinuxConfig {
    fn default() -> Self {
        Self {
            ip_bin: default_ip_bin(),
            dhclient: default_dhclient(),
            run_dir: default_run_dir(),
            resolv_conf: default_resolv_conf(),
            resolvconf_base: default_resolvconf_base(),
            resolvconf: default_resolvconf(),
        }
    }
}

impl LinuxConfig {
    /// Reject empty paths
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("ip_bin", &self.ip_bin),
            ("dhclient", &self.dhclient),
            ("run_dir", &self.run_dir),
            ("resolv_conf", &self.resolv_conf),
            ("resolvconf_base", &self.resolvconf_base),
            ("resolvconf", &self.resolvconf),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(Error::config(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

/// Build the four system adapters
pub fn adapters(config: &LinuxConfig) -> Adapters {
    Adapters {
        address: Arc::new(IpAddressAdapter::new(&config.ip_bin)),
        dhcp: Arc::new(DhclientAdapter::new(&config.dhclient, &config.run_dir)),
        dns: Arc::new(ResolvConfAdapter::new(
            &config.resolv_conf,
            &config.resolvconf_base,
            &config.resolvconf,
        )),
        gateway: Arc::new(IpGatewayAdapter::new(&config.ip_bin)),
    }
}

/// Build the live network inspector
pub fn inspector(config: &LinuxConfig) -> Arc<IpInspector> {
    Arc::new(IpInspector::new(&config.ip_bin))
}
