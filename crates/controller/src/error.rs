use mesh_config::ConfigError;
use mesh_crypto::{Address, CryptoError};
use mesh_networking::NetworkError;
use thiserror::Error;

/// Failure to produce a signed credential
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Signing capability failed: {0}")]
    Capability(String),

    #[error("Failed to encode credential: {0}")]
    Encoding(String),
}

impl From<CryptoError> for SignError {
    fn from(err: CryptoError) -> Self {
        SignError::Capability(err.to_string())
    }
}

impl From<serde_json::Error> for SignError {
    fn from(err: serde_json::Error) -> Self {
        SignError::Encoding(err.to_string())
    }
}

/// Errors raised by an authorization oracle outside the request path
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle not initialized")]
    NotInitialized,

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid whitelist: {0}")]
    InvalidWhitelist(String),
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::InvalidWhitelist(err.to_string())
    }
}

/// Controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Credential signing failed: {0}")]
    Signing(#[from] SignError),

    #[error("Network config assembly failed: {0}")]
    Assembly(#[from] NetworkError),

    #[error("Authorization oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signer {signer} does not match controller identity {identity}")]
    SignerMismatch { identity: Address, signer: Address },
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
