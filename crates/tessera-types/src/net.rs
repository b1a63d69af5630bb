//! Network address value objects: `Inet`, `Cidr`, and `MacAddress`.

use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::TypeError;

/// A host address with an optional network prefix, mirroring PostgreSQL's
/// `inet` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Inet {
    address: IpAddr,
    prefix: Option<u8>,
}

impl Inet {
    /// Create an `inet` value from an address and optional prefix length.
    ///
    /// # Errors
    ///
    /// Fails when the prefix exceeds the address family's bit width.
    pub fn new(address: IpAddr, prefix: Option<u8>) -> Result<Self, TypeError> {
        if let Some(p) = prefix {
            let max = max_prefix(&address);
            if p > max {
                return Err(TypeError::OutOfRange {
                    value: p.to_string(),
                    target: format!("prefix length (max {max})"),
                });
            }
        }
        Ok(Self { address, prefix })
    }

    /// The host address.
    #[must_use]
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// The prefix length, if one was given.
    #[must_use]
    pub fn prefix(&self) -> Option<u8> {
        self.prefix
    }
}

impl fmt::Display for Inet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(p) => write!(f, "{}/{p}", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

impl FromStr for Inet {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let address: IpAddr = addr
                    .parse()
                    .map_err(|_| TypeError::format("inet address", s))?;
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|_| TypeError::format("inet prefix", s))?;
                Self::new(address, Some(prefix))
            }
            None => {
                let address: IpAddr = s
                    .parse()
                    .map_err(|_| TypeError::format("inet address", s))?;
                Ok(Self {
                    address,
                    prefix: None,
                })
            }
        }
    }
}

/// A network in CIDR notation, mirroring PostgreSQL's `cidr` type.
///
/// Unlike [`Inet`], the prefix is mandatory and the stored network is
/// canonical: address bits beyond the prefix length are zeroed on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    /// Create a canonical CIDR value. Host bits beyond `prefix` are zeroed.
    ///
    /// # Errors
    ///
    /// Fails when the prefix exceeds the address family's bit width.
    pub fn new(network: IpAddr, prefix: u8) -> Result<Self, TypeError> {
        let max = max_prefix(&network);
        if prefix > max {
            return Err(TypeError::OutOfRange {
                value: prefix.to_string(),
                target: format!("prefix length (max {max})"),
            });
        }
        Ok(Self {
            network: mask_address(network, prefix),
            prefix,
        })
    }

    /// The canonical (masked) network address.
    #[must_use]
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// The prefix length.
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether the given address falls inside this network.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask_address(addr, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // A bare address is a valid inet but never a valid cidr.
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| TypeError::format("cidr (missing /prefix)", s))?;
        let network: IpAddr = addr
            .parse()
            .map_err(|_| TypeError::format("cidr network", s))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| TypeError::format("cidr prefix", s))?;
        Self::new(network, prefix)
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_address(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let masked = if prefix == 0 {
                0
            } else {
                bits & (u32::MAX << (32 - u32::from(prefix)))
            };
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let masked = if prefix == 0 {
                0
            } else {
                bits & (u128::MAX << (128 - u32::from(prefix)))
            };
            IpAddr::V6(Ipv6Addr::from(masked))
        }
    }
}

/// A MAC address of 6 (EUI-48) or 8 (EUI-64) bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress {
    bytes: [u8; 8],
    len: u8,
}

impl MacAddress {
    /// Create a MAC address from raw bytes.
    ///
    /// # Errors
    ///
    /// Fails unless the slice is exactly 6 or 8 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        match bytes.len() {
            6 | 8 => {
                let mut buf = [0u8; 8];
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(Self {
                    bytes: buf,
                    len: bytes.len() as u8,
                })
            }
            other => Err(TypeError::InvalidLength {
                what: "MAC address",
                expected: "6 or 8 bytes",
                actual: other,
            }),
        }
    }

    /// The address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Whether this is an 8-byte EUI-64 address.
    #[must_use]
    pub fn is_eui64(&self) -> bool {
        self.len == 8
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for b in self.as_bytes() {
            if !first {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = TypeError;

    /// Accepts colon, hyphen, and dot separated forms as well as raw hex.
    ///
    /// Non-hex characters and odd digit counts are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits = String::with_capacity(16);
        for c in s.trim().chars() {
            match c {
                ':' | '-' | '.' => {}
                c if c.is_ascii_hexdigit() => digits.push(c),
                _ => return Err(TypeError::format("MAC address", s)),
            }
        }
        if digits.len() % 2 != 0 {
            return Err(TypeError::format("MAC address", s));
        }
        let mut bytes = Vec::with_capacity(digits.len() / 2);
        let raw = digits.as_bytes();
        for pair in raw.chunks_exact(2) {
            let hi = hex_val(pair[0]);
            let lo = hex_val(pair[1]);
            bytes.push((hi << 4) | lo);
        }
        Self::from_bytes(&bytes)
    }
}

fn hex_val(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}
