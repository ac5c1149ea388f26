use mesh_crypto::Identity;
use mesh_networking::{InetAddress, Result, Route};

use crate::network_config::{
    NetworkConfig, NetworkType, Rule, DEFAULT_MTU, FLAG_ENABLE_BROADCAST,
    FLAG_ENABLE_IPV6_NDP_EMULATION, MAX_NETWORK_NAME_LENGTH,
};

/// Multicast recipients per group a member may address
pub const DEFAULT_MULTICAST_LIMIT: u32 = 32;

/// Revision stamped on every freshly issued config
pub const INITIAL_REVISION: u64 = 1;

/// Assembles network configs from the controller's fixed policy
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    credential_time_max_delta: i64,
    mtu: u32,
    multicast_limit: u32,
}

impl ConfigBuilder {
    pub fn new(credential_time_max_delta: i64) -> Self {
        Self {
            credential_time_max_delta,
            mtu: DEFAULT_MTU,
            multicast_limit: DEFAULT_MULTICAST_LIMIT,
        }
    }

    /// Build an unsigned config granting `identity` one address and one route
    pub fn build(
        &self,
        network_id: u64,
        timestamp: i64,
        identity: &Identity,
        assigned_address: InetAddress,
        route_target: InetAddress,
    ) -> Result<NetworkConfig> {
        let mut nc = NetworkConfig::empty(network_id, timestamp, identity.address());

        nc.credential_time_max_delta = self.credential_time_max_delta;
        nc.revision = INITIAL_REVISION;
        nc.network_type = NetworkType::Private;
        nc.flags = FLAG_ENABLE_BROADCAST | FLAG_ENABLE_IPV6_NDP_EMULATION;
        nc.mtu = self.mtu;
        nc.multicast_limit = self.multicast_limit;
        nc.name = network_name(network_id);

        nc.rules.push(Rule::Accept)?;
        nc.static_ips.push(assigned_address)?;
        nc.routes.push(Route::new(route_target))?;

        Ok(nc)
    }
}

/// Short name shown to members, e.g. `zt123456789abcdef`
pub fn network_name(network_id: u64) -> String {
    let mut name = format!("zt{:x}", network_id);
    name.truncate(MAX_NETWORK_NAME_LENGTH);
    name
}
