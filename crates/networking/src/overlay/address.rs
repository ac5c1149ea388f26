//! Overlay address management
//!
//! Members of a private network receive one IPv6 address inside an
//! RFC 4193 style `fd00::/8` range. The prefix length travels with the
//! address as an explicit attribute.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::error::{Result, NetworkError};

/// Prefix length of member address ranges (the last 40 bits are the member)
pub const MESH_PREFIX_LEN: u8 = 88;

/// Marker bytes placed between the network id and the member address
const MESH_MARKER: [u8; 2] = [0x99, 0x93];

/// An IP address together with the length of its network prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInetAddress")]
pub struct InetAddress {
    ip: IpAddr,
    prefix_len: u8,
}

#[derive(Deserialize)]
struct RawInetAddress {
    ip: IpAddr,
    prefix_len: u8,
}

impl TryFrom<RawInetAddress> for InetAddress {
    type Error = NetworkError;

    fn try_from(raw: RawInetAddress) -> Result<Self> {
        InetAddress::new(raw.ip, raw.prefix_len)
    }
}

impl InetAddress {
    /// Create an address, rejecting prefix lengths longer than the address
    pub fn new(ip: IpAddr, prefix_len: u8) -> Result<Self> {
        let max = max_prefix_len(&ip);
        if prefix_len > max {
            return Err(NetworkError::AddressError(format!(
                "prefix length {} exceeds {} bits for {}",
                prefix_len, max, ip
            )));
        }
        Ok(InetAddress { ip, prefix_len })
    }

    /// IPv6 address from raw bytes
    pub fn ipv6(bytes: [u8; 16], prefix_len: u8) -> Result<Self> {
        Self::new(IpAddr::V6(Ipv6Addr::from(bytes)), prefix_len)
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn is_ipv6(&self) -> bool {
        self.ip.is_ipv6()
    }

    /// The address with every bit past the prefix cleared
    pub fn network(&self) -> InetAddress {
        let ip = match self.ip {
            IpAddr::V4(v4) => {
                let bits = u32::from(v4);
                let mask = if self.prefix_len == 0 { 0 } else { u32::MAX << (32 - u32::from(self.prefix_len)) };
                IpAddr::V4((bits & mask).into())
            }
            IpAddr::V6(v6) => {
                let bits = u128::from(v6);
                let mask = if self.prefix_len == 0 { 0 } else { u128::MAX << (128 - u32::from(self.prefix_len)) };
                IpAddr::V6((bits & mask).into())
            }
        };
        InetAddress { ip, prefix_len: self.prefix_len }
    }

    /// Whether `other` falls inside this address's prefix
    pub fn contains(&self, other: &InetAddress) -> bool {
        if self.ip.is_ipv6() != other.ip.is_ipv6() {
            return false;
        }
        let probe = InetAddress { ip: other.ip, prefix_len: self.prefix_len };
        probe.network().ip == self.network().ip
    }
}

fn max_prefix_len(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

impl FromStr for InetAddress {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        let (ip, prefix) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::AddressError(format!("missing prefix length in {:?}", s)))?;
        let ip: IpAddr = ip.parse()?;
        let prefix_len = prefix
            .parse::<u8>()
            .map_err(|e| NetworkError::AddressError(format!("invalid prefix length {:?}: {}", prefix, e)))?;
        InetAddress::new(ip, prefix_len)
    }
}

/// Turns raw assigned address bytes into member addresses and routes
#[derive(Debug, Clone, Copy)]
pub struct AddressAssigner {
    prefix_len: u8,
}

impl Default for AddressAssigner {
    fn default() -> Self {
        Self { prefix_len: MESH_PREFIX_LEN }
    }
}

impl AddressAssigner {
    /// Create an assigner for the standard /88 member ranges
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The member's own address, carrying the range's prefix length
    pub fn derive_address(&self, bytes: [u8; 16]) -> InetAddress {
        InetAddress {
            ip: IpAddr::V6(Ipv6Addr::from(bytes)),
            prefix_len: self.prefix_len,
        }
    }

    /// The network prefix containing the member's address
    pub fn derive_route_target(&self, bytes: [u8; 16]) -> InetAddress {
        self.derive_address(bytes).network()
    }
}

/// Deterministic address of a member inside a network
///
/// Layout: `fd | network id (8 bytes) | 99 93 | member address (5 bytes)`.
pub fn mesh_address(network_id: u64, member_address: u64) -> Ipv6Addr {
    let mut bytes = [0u8; 16];
    bytes[0] = 0xfd;
    bytes[1..9].copy_from_slice(&network_id.to_be_bytes());
    bytes[9..11].copy_from_slice(&MESH_MARKER);
    bytes[11..16].copy_from_slice(&member_address.to_be_bytes()[3..8]);
    Ipv6Addr::from(bytes)
}
