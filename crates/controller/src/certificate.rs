//! Credentials carried inside a network config
//!
//! Both certificates are signed over a canonical JSON encoding of every
//! field except the signature itself.

use mesh_crypto::{Address, Identity};
use mesh_networking::{BoundedVec, InetAddress};
use serde::{Deserialize, Serialize};

use crate::error::SignError;

/// Maximum number of things one ownership certificate can claim
pub const MAX_OWNED_THINGS: usize = 16;

/// Proves that `subject` was a member of `network_id` at `issued_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateOfMembership {
    /// Issue time in milliseconds since the epoch
    pub issued_at: i64,
    /// Length of the validity window in milliseconds
    pub valid_for_delta: i64,
    pub network_id: u64,
    pub subject: Address,
    pub signed_by: Address,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl CertificateOfMembership {
    /// An unsigned certificate
    pub fn new(issued_at: i64, valid_for_delta: i64, network_id: u64, subject: Address) -> Self {
        CertificateOfMembership {
            issued_at,
            valid_for_delta,
            network_id,
            subject,
            signed_by: Address::new(0),
            signature: Vec::new(),
        }
    }

    /// Last instant (inclusive) at which the certificate is valid
    pub fn expires_at(&self) -> i64 {
        self.issued_at.saturating_add(self.valid_for_delta)
    }

    /// Whether `now` lies in `[issued_at, issued_at + valid_for_delta]`
    pub fn is_valid_at(&self, now: i64) -> bool {
        now >= self.issued_at && now <= self.expires_at()
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Generate canonical form for signing
    pub fn to_canonical_form(&self) -> Result<Vec<u8>, SignError> {
        let mut canonical = self.clone();
        canonical.signature = Vec::new();
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// Check the signature against the issuing controller's identity
    pub fn verify(&self, signer: &Identity) -> bool {
        if !self.is_signed() || self.signed_by != signer.address() {
            return false;
        }
        match self.to_canonical_form() {
            Ok(message) => signer.verify(&message, &self.signature).unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Proves that `owner` holds the listed addresses on `network_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateOfOwnership {
    pub network_id: u64,
    /// Issue time in milliseconds since the epoch
    pub issued_at: i64,
    pub owner: Address,
    /// Certificate id, distinguishing several certificates held by one owner
    pub sequence_number: u32,
    pub things: BoundedVec<InetAddress>,
    pub signed_by: Address,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl CertificateOfOwnership {
    /// An unsigned certificate with no things
    pub fn new(network_id: u64, issued_at: i64, owner: Address, sequence_number: u32) -> Self {
        CertificateOfOwnership {
            network_id,
            issued_at,
            owner,
            sequence_number,
            things: BoundedVec::new("owned things", MAX_OWNED_THINGS),
            signed_by: Address::new(0),
            signature: Vec::new(),
        }
    }

    pub fn add_thing(&mut self, thing: InetAddress) -> mesh_networking::Result<()> {
        self.things.push(thing)
    }

    /// Whether this certificate claims `ip` (prefix length is ignored)
    pub fn owns(&self, thing: &InetAddress) -> bool {
        self.things.iter().any(|t| t.ip() == thing.ip())
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Generate canonical form for signing
    pub fn to_canonical_form(&self) -> Result<Vec<u8>, SignError> {
        let mut canonical = self.clone();
        canonical.signature = Vec::new();
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// Check the signature against the issuing controller's identity
    pub fn verify(&self, signer: &Identity) -> bool {
        if !self.is_signed() || self.signed_by != signer.address() {
            return false;
        }
        match self.to_canonical_form() {
            Ok(message) => signer.verify(&message, &self.signature).unwrap_or(false),
            Err(_) => false,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
