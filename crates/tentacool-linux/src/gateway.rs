//! Default route through iproute2

use async_trait::async_trait;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{debug, info};

use tentacool_core::Result;
use tentacool_core::records::GatewayRecord;
use tentacool_core::traits::SystemAdapter;

use crate::command;

const ADAPTER: &str = "ip route";

/// Installs and removes the default route with `ip route`
#[derive(Debug, Clone)]
pub struct IpGatewayAdapter {
    ip: PathBuf,
}

impl IpGatewayAdapter {
    /// Create an adapter using the `ip` binary at `ip`
    pub fn new(ip: impl Into<PathBuf>) -> Self {
        Self { ip: ip.into() }
    }
}

fn route_args(verb: &str, next_hop: IpAddr, link: &str) -> Vec<String> {
    let mut args = Vec::with_capacity(8);
    if next_hop.is_ipv6() {
        args.push("-6".to_string());
    }
    args.extend(
        ["route", verb, "default", "via"]
            .iter()
            .map(|part| part.to_string()),
    );
    args.push(next_hop.to_string());
    if !link.is_empty() {
        args.push("dev".to_string());
        args.push(link.to_string());
    }
    args
}

#[async_trait]
impl SystemAdapter<GatewayRecord> for IpGatewayAdapter {
    async fn apply(&self, record: &GatewayRecord) -> Result<()> {
        let next_hop = record.next_hop()?;
        info!("Adding default route via {}", next_hop);

        match command::run(&self.ip, &route_args("add", next_hop, &record.link)).await {
            Ok(_) => Ok(()),
            Err(e) if e.stderr_contains("File exists") => {
                debug!("Default route via {} already present", next_hop);
                Ok(())
            }
            Err(e) => Err(e.into_apply_error(ADAPTER)),
        }
    }

    async fn remove(&self, record: &GatewayRecord) -> Result<()> {
        let next_hop = record.next_hop()?;
        info!("Deleting default route via {}", next_hop);

        match command::run(&self.ip, &route_args("del", next_hop, &record.link)).await {
            Ok(_) => Ok(()),
            Err(e) if e.stderr_contains("No such process") => {
                debug!("Default route via {} already gone", next_hop);
                Ok(())
            }
            Err(e) => Err(e.into_apply_error(ADAPTER)),
        }
    }

    fn adapter_name(&self) -> &'static str {
        ADAPTER
    }
}
