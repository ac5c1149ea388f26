//! Authorization oracles
//!
//! The controller asks an [`AuthorizationOracle`] whether a member may join
//! a network and which address it gets. Oracles are shared between
//! concurrent requests and must be safe to call from many threads.

pub mod whitelist;

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use mesh_networking::mesh_address;

use crate::error::OracleError;

pub use whitelist::{Whitelist, WhitelistNetwork, WhitelistOracle};

/// Answer to one authorization query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    /// Address to assign; only meaningful when `authorized` is set
    pub assigned_address_bytes: [u8; 16],
}

impl AuthorizationDecision {
    pub fn allowed(assigned_address_bytes: [u8; 16]) -> Self {
        Self {
            authorized: true,
            assigned_address_bytes,
        }
    }

    pub fn denied() -> Self {
        Self {
            authorized: false,
            assigned_address_bytes: [0; 16],
        }
    }
}

/// Decides membership for the networks a controller manages
pub trait AuthorizationOracle: Send + Sync {
    /// Prepare the oracle for a controller rooted at `home_path`
    fn init(&self, controller_address: u64, home_path: &Path) -> Result<(), OracleError>;

    /// May `member_address` join `network_id`, and with which address?
    fn check(&self, network_id: u64, member_address: u64) -> AuthorizationDecision;

    /// Re-read policy
    fn reload(&self) -> Result<(), OracleError>;

    /// Address passed to `init`, or 0 before initialization
    fn controller_address(&self) -> u64;
}

/// In-memory oracle backed by an explicit allow table
#[derive(Debug, Default)]
pub struct StaticOracle {
    controller_address: AtomicU64,
    grants: RwLock<HashMap<(u64, u64), [u8; 16]>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a member with an explicit address
    pub fn allow(&self, network_id: u64, member_address: u64, assigned: [u8; 16]) {
        let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
        grants.insert((network_id, member_address), assigned);
    }

    /// Allow a member with its deterministic mesh address
    pub fn allow_mesh(&self, network_id: u64, member_address: u64) {
        self.allow(network_id, member_address, mesh_address(network_id, member_address).octets());
    }

    pub fn revoke(&self, network_id: u64, member_address: u64) {
        let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
        grants.remove(&(network_id, member_address));
    }
}

impl AuthorizationOracle for StaticOracle {
    fn init(&self, controller_address: u64, _home_path: &Path) -> Result<(), OracleError> {
        self.controller_address.store(controller_address, Ordering::SeqCst);
        Ok(())
    }

    fn check(&self, network_id: u64, member_address: u64) -> AuthorizationDecision {
        let grants = self.grants.read().unwrap_or_else(|e| e.into_inner());
        grants
            .get(&(network_id, member_address))
            .map(|bytes| AuthorizationDecision::allowed(*bytes))
            .unwrap_or_else(AuthorizationDecision::denied)
    }

    fn reload(&self) -> Result<(), OracleError> {
        Ok(())
    }

    fn controller_address(&self) -> u64 {
        self.controller_address.load(Ordering::SeqCst)
    }
}
