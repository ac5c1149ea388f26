//! Overlay addressing for the mesh controller
//!
//! Address derivation, routes and the bounded sequences that network
//! configurations are assembled from.

pub mod bounded;
pub mod error;
pub mod overlay;

pub use bounded::BoundedVec;
pub use error::{NetworkError, Result};
pub use overlay::{AddressAssigner, InetAddress, Route, MESH_PREFIX_LEN, mesh_address};
