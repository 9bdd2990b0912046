//! Live network views from `ip -j`
//!
//! iproute2 emits JSON with `-j`; only the fields the API reports are
//! decoded, the rest is ignored.

use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;

use tentacool_core::traits::{InterfaceAddress, InterfaceInfo, NetworkInspector};
use tentacool_core::{Cidr, Error, Result};

use crate::command::{self, args};

#[derive(Debug, Deserialize)]
struct Link {
    ifname: String,
    #[serde(default)]
    mtu: u32,
    #[serde(default)]
    link_type: String,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct LinkAddresses {
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    local: IpAddr,
    prefixlen: u8,
}

/// Decode `ip -j link show`
pub fn parse_links(json: &str) -> Result<Vec<InterfaceInfo>> {
    let links: Vec<Link> = serde_json::from_str(json)?;
    Ok(links
        .into_iter()
        .map(|link| InterfaceInfo {
            hardware_addr: if link.link_type == "loopback" {
                String::new()
            } else {
                link.address
            },
            name: link.ifname,
            mtu: link.mtu,
        })
        .collect())
}

/// Decode `ip -j addr show dev <name>`
pub fn parse_addresses(json: &str) -> Result<Vec<InterfaceAddress>> {
    let links: Vec<LinkAddresses> = serde_json::from_str(json)?;
    let mut addresses = Vec::new();
    for info in links.into_iter().flat_map(|link| link.addr_info) {
        let cidr = Cidr::new(info.local, info.prefixlen)?;
        addresses.push(InterfaceAddress {
            ip: cidr.addr().to_string(),
            mask: cidr.mask_hex(),
        });
    }
    Ok(addresses)
}

/// Decode `ip -j route show`, keeping entries as reported
pub fn parse_routes(json: &str) -> Result<Vec<serde_json::Value>> {
    // Older iproute2 prints nothing at all for an empty table
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

/// Inspects the live system with iproute2
#[derive(Debug, Clone)]
pub struct IpInspector {
    ip: PathBuf,
}

impl IpInspector {
    /// Create an inspector using the `ip` binary at `ip`
    pub fn new(ip: impl Into<PathBuf>) -> Self {
        Self { ip: ip.into() }
    }

    async fn query(&self, parts: Vec<String>) -> Result<String> {
        command::run(&self.ip, &parts)
            .await
            .map_err(|e| Error::other(e.to_string()))
    }
}

#[async_trait]
impl NetworkInspector for IpInspector {
    async fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        let out = self.query(args(["-j", "link", "show"])).await?;
        parse_links(&out)
    }

    async fn interface_addresses(&self, name: &str) -> Result<Vec<InterfaceAddress>> {
        match command::run(&self.ip, &args(["-j", "addr", "show", "dev", name])).await {
            Ok(out) => parse_addresses(&out),
            Err(e) if e.stderr_contains("does not exist") => {
                Err(Error::not_found(format!("interface {} not found", name)))
            }
            Err(e) => Err(Error::other(e.to_string())),
        }
    }

    async fn routes(&self) -> Result<Vec<serde_json::Value>> {
        let mut routes = parse_routes(&self.query(args(["-j", "route", "show"])).await?)?;
        routes.extend(parse_routes(
            &self.query(args(["-j", "-6", "route", "show"])).await?,
        )?);
        Ok(routes)
    }
}
