//! Network membership controller
//!
//! Decides whether a member may join a private overlay network and, if so,
//! issues it a signed [`NetworkConfig`]: one IPv6 address, one route, an
//! accept-all rule set, a certificate of membership and a certificate of
//! ownership for the assigned address.

pub mod builder;
pub mod certificate;
pub mod error;
pub mod network_config;
pub mod oracle;
pub mod service;
pub mod signer;
pub mod transport;

// Re-export main types
pub use builder::ConfigBuilder;
pub use certificate::{CertificateOfMembership, CertificateOfOwnership};
pub use error::{ControllerError, OracleError, Result, SignError};
pub use network_config::{NetworkConfig, NetworkType, Rule};
pub use oracle::{AuthorizationDecision, AuthorizationOracle, StaticOracle, WhitelistOracle};
pub use service::{
    ControllerService, ControllerState, JoinRequest, Metadata, RequestOutcome,
    CREDENTIAL_TIME_MAX_DELTA,
};
pub use signer::{CredentialSigner, SigningCapability};
pub use transport::{ErrorCode, Transport};
