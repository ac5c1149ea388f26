pub mod identity;

use sha2::{Sha256, Digest};
use thiserror::Error;
use std::fmt;

pub use identity::{Address, Identity};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Verification error: {0}")]
    VerificationError(String),

    #[error("Identity has no secret key")]
    MissingSecretKey,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Hash type for cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hash(pub Vec<u8>);

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// General cryptographic utilities
pub struct CryptoUtils;

impl CryptoUtils {
    /// Calculate SHA-256 hash of data
    pub fn sha256(data: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Hash(hasher.finalize().to_vec())
    }
}
