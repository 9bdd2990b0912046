//! CIDR notation parsing (`address/prefix`)

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::Error;

/// An interface address with its prefix length, e.g. `192.168.1.10/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    addr: IpAddr,
    prefix: u8,
}

impl Cidr {
    /// Build a CIDR, checking the prefix fits the address family
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, Error> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(Error::validation(format!(
                "prefix length {} exceeds {} for {}",
                prefix, max, addr
            )));
        }
        Ok(Self { addr, prefix })
    }

    /// Host address part
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Network this address belongs to, host bits cleared
    pub fn network(&self) -> Cidr {
        let addr = match self.addr {
            IpAddr::V4(v4) => {
                let bits = u32::from(v4) & v4_mask(self.prefix);
                IpAddr::V4(Ipv4Addr::from(bits))
            }
            IpAddr::V6(v6) => {
                let bits = u128::from(v6) & v6_mask(self.prefix);
                IpAddr::V6(Ipv6Addr::from(bits))
            }
        };
        Cidr {
            addr,
            prefix: self.prefix,
        }
    }

    /// Netmask rendered as lowercase hex, `ffffff00` for a /24
    pub fn mask_hex(&self) -> String {
        match self.addr {
            IpAddr::V4(_) => format!("{:08x}", v4_mask(self.prefix)),
            IpAddr::V6(_) => format!("{:032x}", v6_mask(self.prefix)),
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| Error::validation(format!("invalid CIDR address: {}", s)))?;

        let addr: IpAddr = addr
            .parse()
            .map_err(|_| Error::validation(format!("invalid CIDR address: {}", s)))?;

        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::validation(format!("invalid CIDR address: {}", s)));
        }
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::validation(format!("invalid CIDR address: {}", s)))?;

        Cidr::new(addr, prefix)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
