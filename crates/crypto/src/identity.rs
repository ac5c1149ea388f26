//! Node identities
//!
//! Every participant (controller or member) is identified by an Ed25519
//! public key. The 40-bit [`Address`] derived from that key is what the
//! controller uses when authorizing members and issuing credentials.
//! A controller identity also holds the secret key used for signing.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{CryptoError, CryptoResult, CryptoUtils};

/// Number of meaningful bits in an address
pub const ADDRESS_BITS: u32 = 40;

const ADDRESS_MASK: u64 = (1 << ADDRESS_BITS) - 1;

/// Length of the secret key file written by [`Identity::save`]
pub const SECRET_KEY_FILE_LEN: usize = 32;

/// A 40-bit node address, formatted as ten hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    /// Create an address, discarding anything above the low 40 bits
    pub fn new(value: u64) -> Self {
        Address(value & ADDRESS_MASK)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }

    /// Big-endian 5-byte representation
    pub fn to_bytes(self) -> [u8; 5] {
        let b = self.0.to_be_bytes();
        [b[3], b[4], b[5], b[6], b[7]]
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010x}", self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > 10 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidInput(format!("Invalid address: {:?}", s)));
        }
        u64::from_str_radix(s, 16)
            .map(Address::new)
            .map_err(|e| CryptoError::InvalidInput(format!("Invalid address {:?}: {}", s, e)))
    }
}

/// An Ed25519 identity, optionally carrying its secret key
#[derive(Clone)]
pub struct Identity {
    public: PublicKey,
    keypair: Option<Arc<Keypair>>,
    address: Address,
}

impl Identity {
    /// Generate a new identity with a random keypair
    pub fn generate() -> Self {
        let keypair = Keypair::generate(&mut OsRng);
        Self::from_keypair(keypair)
    }

    /// Wrap an existing keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        let public = keypair.public;
        Identity {
            public,
            keypair: Some(Arc::new(keypair)),
            address: derive_address(&public),
        }
    }

    /// Reconstruct an identity from 32 secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let secret = SecretKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidInput(format!("Invalid secret key: {}", e)))?;
        let public = PublicKey::from(&secret);
        Ok(Self::from_keypair(Keypair { secret, public }))
    }

    /// A verify-only identity, as presented by a remote member
    pub fn from_public_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let public = PublicKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidInput(format!("Invalid public key: {}", e)))?;
        Ok(Identity {
            public,
            keypair: None,
            address: derive_address(&public),
        })
    }

    /// Load an identity from a key file, or generate and save one if it doesn't exist
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let identity = Self::generate();
            identity.save(path)?;
            info!("generated new identity {} at {}", identity.address(), path.display());
            Ok(identity)
        }
    }

    /// Load an identity from a 32-byte secret key file
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() != SECRET_KEY_FILE_LEN {
            return Err(CryptoError::InvalidInput(format!(
                "Invalid key length: expected {} bytes, got {}",
                SECRET_KEY_FILE_LEN,
                bytes.len()
            )));
        }
        Self::from_secret_bytes(&bytes)
    }

    /// Write the secret key to a file
    pub fn save(&self, path: impl AsRef<Path>) -> CryptoResult<()> {
        let keypair = self.keypair.as_ref().ok_or(CryptoError::MissingSecretKey)?;
        fs::write(path, keypair.secret.as_bytes())?;
        Ok(())
    }

    /// Copy of this identity without the secret key
    pub fn public_only(&self) -> Self {
        Identity {
            public: self.public,
            keypair: None,
            address: self.address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    pub fn has_secret(&self) -> bool {
        self.keypair.is_some()
    }

    /// Sign a message with this identity's secret key
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        let keypair = self.keypair.as_ref().ok_or(CryptoError::MissingSecretKey)?;
        keypair
            .try_sign(message)
            .map_err(|e| CryptoError::SigningError(e.to_string()))
    }

    /// Verify a raw signature made by this identity
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let signature = Signature::try_from(signature)
            .map_err(|e| CryptoError::VerificationError(e.to_string()))?;
        Ok(self.public.verify(message, &signature).is_ok())
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("has_secret", &self.has_secret())
            .finish()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, hex::encode(self.public.as_bytes()))
    }
}

/// First 40 bits of SHA-256 over the public key
fn derive_address(public: &PublicKey) -> Address {
    let hash = CryptoUtils::sha256(public.as_bytes());
    let mut value = 0u64;
    for byte in &hash.0[..5] {
        value = (value << 8) | u64::from(*byte);
    }
    Address::new(value)
}
