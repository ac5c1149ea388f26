//! Mesh
//!
//! A membership controller for private IPv6 overlay networks: it authorizes
//! join requests and issues signed network configurations.

/// Module version information
pub mod version {
    /// The current version of the mesh library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

pub use mesh_config as config;
pub use mesh_controller as controller;
pub use mesh_crypto as crypto;
pub use mesh_networking as networking;

pub use mesh_controller::{
    AuthorizationOracle, ControllerService, ErrorCode, NetworkConfig, RequestOutcome,
    StaticOracle, Transport, WhitelistOracle,
};
