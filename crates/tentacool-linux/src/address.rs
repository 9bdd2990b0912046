//! Interface addresses through iproute2

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tentacool_core::records::AddressRecord;
use tentacool_core::traits::SystemAdapter;
use tentacool_core::{Cidr, Result};

use crate::command::{self, args};

const ADAPTER: &str = "ip addr";

/// Assigns and removes interface addresses with `ip addr`
#[derive(Debug, Clone)]
pub struct IpAddressAdapter {
    ip: PathBuf,
}

impl IpAddressAdapter {
    /// Create an adapter using the `ip` binary at `ip`
    pub fn new(ip: impl Into<PathBuf>) -> Self {
        Self { ip: ip.into() }
    }
}

fn add_args(cidr: &Cidr, link: &str) -> Vec<String> {
    args(["addr", "add", &cidr.to_string(), "dev", link])
}

fn del_args(cidr: &Cidr, link: &str) -> Vec<String> {
    args(["addr", "del", &cidr.to_string(), "dev", link])
}

fn prefix_route_args(cidr: &Cidr, link: &str) -> Vec<String> {
    args(["route", "replace", &cidr.network().to_string(), "dev", link])
}

#[async_trait]
impl SystemAdapter<AddressRecord> for IpAddressAdapter {
    async fn apply(&self, record: &AddressRecord) -> Result<()> {
        let cidr = record.cidr()?;
        info!("Assigning {} to {}", cidr, record.link);

        match command::run(&self.ip, &add_args(&cidr, &record.link)).await {
            Ok(_) => {}
            Err(e) if e.stderr_contains("File exists") => {
                debug!("{} already assigned to {}", cidr, record.link);
            }
            Err(e) => return Err(e.into_apply_error(ADAPTER)),
        }

        // The kernel usually adds this route itself; failing here is not fatal
        if let Err(e) = command::run(&self.ip, &prefix_route_args(&cidr, &record.link)).await {
            warn!("Failed to install prefix route for {}: {}", cidr, e);
        }

        Ok(())
    }

    async fn remove(&self, record: &AddressRecord) -> Result<()> {
        let cidr = record.cidr()?;
        info!("Removing {} from {}", cidr, record.link);

        match command::run(&self.ip, &del_args(&cidr, &record.link)).await {
            Ok(_) => Ok(()),
            Err(e)
                if e.stderr_contains("Cannot assign requested address")
                    || e.stderr_contains("does not exist") =>
            {
                debug!("{} was not assigned to {}", cidr, record.link);
                Ok(())
            }
            Err(e) => Err(e.into_apply_error(ADAPTER)),
        }
    }

    fn adapter_name(&self) -> &'static str {
        ADAPTER
    }
}
