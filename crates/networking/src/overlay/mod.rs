//! Overlay network module

pub mod address;
pub mod routing;

// Re-export types
pub use self::address::{AddressAssigner, InetAddress, MESH_PREFIX_LEN, mesh_address};

pub use self::routing::Route;
