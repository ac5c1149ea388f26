//! File-backed whitelist oracle
//!
//! Reads `controller.json` from the controller home:
//!
//! ```json
//! { "networks": [ { "id": "abcdef0123000001", "members": ["abcdef0123", "0123456789"] } ] }
//! ```
//!
//! A network is only served if its upper 40 bits are this controller's
//! address. Listed members receive their deterministic mesh address.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use mesh_networking::mesh_address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AuthorizationDecision, AuthorizationOracle};
use crate::error::OracleError;

/// Default whitelist file name inside the controller home
pub const WHITELIST_FILE: &str = "controller.json";

/// On-disk whitelist document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Whitelist {
    #[serde(default)]
    pub networks: Vec<WhitelistNetwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistNetwork {
    /// Network id as 16 hex digits
    pub id: String,
    /// Member addresses as 10 hex digits
    #[serde(default)]
    pub members: Vec<String>,
}

impl Whitelist {
    pub fn load(path: &Path) -> Result<Self, OracleError> {
        let contents = fs::read_to_string(path).map_err(|e| OracleError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Index the document by numeric network id
    fn index(&self) -> Result<HashMap<u64, HashSet<u64>>, OracleError> {
        let mut table = HashMap::new();
        for network in &self.networks {
            let nwid = parse_hex(&network.id, 16)?;
            let members: &mut HashSet<u64> = table.entry(nwid).or_default();
            for member in &network.members {
                members.insert(parse_hex(member, 10)?);
            }
        }
        Ok(table)
    }
}

fn parse_hex(s: &str, max_digits: usize) -> Result<u64, OracleError> {
    let s = s.trim();
    if s.is_empty() || s.len() > max_digits || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(OracleError::InvalidWhitelist(format!(
            "expected 1 to {} hex digits, got {:?}",
            max_digits, s
        )));
    }
    u64::from_str_radix(s, 16)
        .map_err(|e| OracleError::InvalidWhitelist(format!("{:?}: {}", s, e)))
}

/// Whether `network_id` belongs to the controller at `controller_address`
pub fn manages_network(network_id: u64, controller_address: u64) -> bool {
    (network_id >> 24) == controller_address
}

#[derive(Debug)]
struct LoadedWhitelist {
    controller_address: u64,
    path: PathBuf,
    members: HashMap<u64, HashSet<u64>>,
}

/// Oracle backed by a JSON whitelist in the controller home
#[derive(Debug)]
pub struct WhitelistOracle {
    file_name: String,
    state: RwLock<Option<LoadedWhitelist>>,
}

impl Default for WhitelistOracle {
    fn default() -> Self {
        Self::new(WHITELIST_FILE)
    }
}

impl WhitelistOracle {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            state: RwLock::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl AuthorizationOracle for WhitelistOracle {
    fn init(&self, controller_address: u64, home_path: &Path) -> Result<(), OracleError> {
        let path = home_path.join(&self.file_name);
        info!(
            "whitelist oracle init: controller={:010x}, config={}",
            controller_address,
            path.display()
        );

        let members = Whitelist::load(&path)?.index()?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = Some(LoadedWhitelist {
            controller_address,
            path,
            members,
        });
        Ok(())
    }

    fn check(&self, network_id: u64, member_address: u64) -> AuthorizationDecision {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let loaded = match state.as_ref() {
            Some(loaded) => loaded,
            None => {
                warn!("whitelist oracle not initialized, denying {:010x}", member_address);
                return AuthorizationDecision::denied();
            }
        };

        if !manages_network(network_id, loaded.controller_address) {
            debug!("network {:016x} is not managed by this controller", network_id);
            return AuthorizationDecision::denied();
        }

        let listed = loaded
            .members
            .get(&network_id)
            .map(|members| members.contains(&member_address))
            .unwrap_or(false);
        if !listed {
            debug!("member {:010x} not authorized for {:016x}", member_address, network_id);
            return AuthorizationDecision::denied();
        }

        let ip = mesh_address(network_id, member_address);
        debug!("authorized {:010x} for {:016x} -> {}", member_address, network_id, ip);
        AuthorizationDecision::allowed(ip.octets())
    }

    fn reload(&self) -> Result<(), OracleError> {
        let path = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state.as_ref().ok_or(OracleError::NotInitialized)?.path.clone()
        };

        // Parse outside the lock; a bad file leaves the previous table in place
        let members = Whitelist::load(&path)?.index()?;

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let loaded = state.as_mut().ok_or(OracleError::NotInitialized)?;
        loaded.members = members;
        info!("whitelist reloaded from {}", path.display());
        Ok(())
    }

    fn controller_address(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.as_ref().map(|s| s.controller_address).unwrap_or(0)
    }
}
