//! Network configuration issued to authorized members

use mesh_crypto::Address;
use mesh_networking::{BoundedVec, InetAddress, Result, Route};
use serde::{Deserialize, Serialize};

use crate::certificate::{CertificateOfMembership, CertificateOfOwnership};

/// Default overlay MTU
pub const DEFAULT_MTU: u32 = 2800;

/// Maximum number of rules in a config
pub const MAX_NETWORK_RULES: usize = 1024;

/// Maximum number of static addresses assigned to one member
pub const MAX_STATIC_IPS: usize = 32;

/// Maximum number of routes pushed to one member
pub const MAX_NETWORK_ROUTES: usize = 128;

/// Maximum number of ownership certificates carried by one config
pub const MAX_CERTIFICATES_OF_OWNERSHIP: usize = 4;

/// Maximum length of a network's short name
pub const MAX_NETWORK_NAME_LENGTH: usize = 127;

/// Allow ff:ff:ff:ff:ff:ff broadcast
pub const FLAG_ENABLE_BROADCAST: u64 = 0x0000_0000_0000_0002;

/// Emulate IPv6 neighbor discovery for the managed address ranges
pub const FLAG_ENABLE_IPV6_NDP_EMULATION: u64 = 0x0000_0000_0000_0004;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Membership requires a certificate issued by the controller
    Private,
}

/// A traffic rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Accept every frame
    Accept,
}

/// Configuration for one member of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: u64,
    /// Issue time in milliseconds since the epoch
    pub timestamp: i64,
    pub credential_time_max_delta: i64,
    pub revision: u64,
    pub issued_to: Address,
    pub network_type: NetworkType,
    pub flags: u64,
    pub mtu: u32,
    pub multicast_limit: u32,
    pub name: String,
    pub rules: BoundedVec<Rule>,
    pub static_ips: BoundedVec<InetAddress>,
    pub routes: BoundedVec<Route>,
    pub com: Option<CertificateOfMembership>,
    pub certificates_of_ownership: BoundedVec<CertificateOfOwnership>,
}

impl NetworkConfig {
    /// An empty config with all sequences at their standard capacities
    pub fn empty(network_id: u64, timestamp: i64, issued_to: Address) -> Self {
        NetworkConfig {
            network_id,
            timestamp,
            credential_time_max_delta: 0,
            revision: 0,
            issued_to,
            network_type: NetworkType::Private,
            flags: 0,
            mtu: DEFAULT_MTU,
            multicast_limit: 0,
            name: String::new(),
            rules: BoundedVec::new("rules", MAX_NETWORK_RULES),
            static_ips: BoundedVec::new("static addresses", MAX_STATIC_IPS),
            routes: BoundedVec::new("routes", MAX_NETWORK_ROUTES),
            com: None,
            certificates_of_ownership: BoundedVec::new(
                "certificates of ownership",
                MAX_CERTIFICATES_OF_OWNERSHIP,
            ),
        }
    }

    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag == flag
    }

    pub fn is_private(&self) -> bool {
        self.network_type == NetworkType::Private
    }

    /// Attach the signed credentials
    pub fn attach_credentials(
        &mut self,
        com: CertificateOfMembership,
        coo: CertificateOfOwnership,
    ) -> Result<()> {
        self.certificates_of_ownership.push(coo)?;
        self.com = Some(com);
        Ok(())
    }
}
