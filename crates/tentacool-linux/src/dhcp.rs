//! DHCP client control through ISC dhclient
//!
//! One client per interface, tracked by a pid file under the run directory.
//! `-nw` makes dhclient daemonize at once instead of waiting for a lease.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use tentacool_core::Result;
use tentacool_core::records::DhcpState;
use tentacool_core::traits::SystemAdapter;

use crate::command;

const ADAPTER: &str = "dhclient";

/// Starts and stops dhclient
#[derive(Debug, Clone)]
pub struct DhclientAdapter {
    dhclient: PathBuf,
    run_dir: PathBuf,
}

impl DhclientAdapter {
    /// Create an adapter running `dhclient`, with pid files under `run_dir`
    pub fn new(dhclient: impl Into<PathBuf>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            dhclient: dhclient.into(),
            run_dir: run_dir.into(),
        }
    }

    fn pid_file(&self, interface: &str) -> PathBuf {
        self.run_dir.join(format!("dhclient.{}.pid", interface))
    }

    async fn start(&self, interface: &str) -> Result<()> {
        let pid_file = self.pid_file(interface);
        if client_running(&pid_file, &self.dhclient).await {
            debug!("DHCP client already running on {}", interface);
            return Ok(());
        }

        info!("Starting DHCP client on {}", interface);
        command::run(&self.dhclient, &start_args(&pid_file, interface))
            .await
            .map_err(|e| e.into_apply_error(ADAPTER))?;
        Ok(())
    }

    async fn stop(&self, interface: &str) -> Result<()> {
        let pid_file = self.pid_file(interface);
        if !client_running(&pid_file, &self.dhclient).await {
            debug!("No DHCP client running on {}", interface);
            return Ok(());
        }

        info!("Stopping DHCP client on {}", interface);
        command::run(&self.dhclient, &stop_args(&pid_file, interface))
            .await
            .map_err(|e| e.into_apply_error(ADAPTER))?;
        Ok(())
    }
}

fn start_args(pid_file: &Path, interface: &str) -> Vec<String> {
    vec![
        "-nw".to_string(),
        "-pf".to_string(),
        pid_file.display().to_string(),
        interface.to_string(),
    ]
}

fn stop_args(pid_file: &Path, interface: &str) -> Vec<String> {
    vec![
        "-x".to_string(),
        "-pf".to_string(),
        pid_file.display().to_string(),
        interface.to_string(),
    ]
}

/// Kernel limit on a process `comm` name
const COMM_LEN: usize = 15;

/// Whether the pid file names a live `dhclient` process
///
/// The process name must match the client binary; a pid left over from
/// before a reboot may belong to anything.
async fn client_running(pid_file: &Path, dhclient: &Path) -> bool {
    let Ok(content) = tokio::fs::read_to_string(pid_file).await else {
        return false;
    };
    let Ok(pid) = content.trim().parse::<u32>() else {
        return false;
    };
    let comm_path = Path::new("/proc").join(pid.to_string()).join("comm");
    let Ok(comm) = tokio::fs::read_to_string(&comm_path).await else {
        return false;
    };

    let running = comm.trim_end() == comm_name(dhclient);
    if !running {
        debug!(
            "Pid {} from {} is '{}', not a DHCP client",
            pid,
            pid_file.display(),
            comm.trim_end()
        );
    }
    running
}

/// The `comm` name a process started from `binary` carries
fn comm_name(binary: &Path) -> String {
    let name = binary
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.chars().take(COMM_LEN).collect()
}

#[async_trait]
impl SystemAdapter<DhcpState> for DhclientAdapter {
    async fn apply(&self, state: &DhcpState) -> Result<()> {
        if state.active {
            self.start(&state.interface).await
        } else {
            self.stop(&state.interface).await
        }
    }

    async fn remove(&self, state: &DhcpState) -> Result<()> {
        if state.active {
            self.stop(&state.interface).await
        } else {
            Ok(())
        }
    }

    fn adapter_name(&self) -> &'static str {
        ADAPTER
    }
}
