use serde::{Serialize, Deserialize};
use crate::overlay::address::InetAddress;

/// A route pushed to members as part of their network configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Destination prefix
    pub target: InetAddress,
    /// Gateway, or `None` for a route that is reachable on the overlay itself
    pub via: Option<InetAddress>,
    /// Route flags (currently unused, always zero)
    pub flags: u16,
    /// Route metric (lower is better)
    pub metric: u16,
}

impl Route {
    /// An on-link route to `target`
    pub fn new(target: InetAddress) -> Self {
        Self {
            target,
            via: None,
            flags: 0,
            metric: 0,
        }
    }

    /// Route through a gateway
    pub fn via(target: InetAddress, gateway: InetAddress) -> Self {
        Self {
            via: Some(gateway),
            ..Self::new(target)
        }
    }

    /// Whether `address` is covered by this route
    pub fn covers(&self, address: &InetAddress) -> bool {
        self.target.contains(address)
    }
}
