//! Credential signing
//!
//! [`CredentialSigner`] turns the raw [`SigningCapability`] of the
//! controller identity into signed membership and ownership certificates.

use std::sync::Arc;

use mesh_crypto::{Address, Identity};
use mesh_networking::InetAddress;
use tracing::debug;

use crate::certificate::{CertificateOfMembership, CertificateOfOwnership};
use crate::error::SignError;

/// The external signing primitive, bound to one controller identity
pub trait SigningCapability: Send + Sync {
    /// Address of the identity the signatures belong to
    fn signer_address(&self) -> Address;

    /// Sign `message`, returning the raw signature bytes
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignError>;
}

impl SigningCapability for Identity {
    fn signer_address(&self) -> Address {
        self.address()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = Identity::sign(self, message)?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// Issues certificates signed by the controller
#[derive(Clone)]
pub struct CredentialSigner {
    capability: Arc<dyn SigningCapability>,
}

impl CredentialSigner {
    pub fn new(capability: Arc<dyn SigningCapability>) -> Self {
        Self { capability }
    }

    pub fn signer_address(&self) -> Address {
        self.capability.signer_address()
    }

    /// Sign a certificate of membership for `identity`
    pub fn sign_membership(
        &self,
        network_id: u64,
        timestamp: i64,
        valid_for_delta: i64,
        identity: &Identity,
    ) -> Result<CertificateOfMembership, SignError> {
        let mut com = CertificateOfMembership::new(timestamp, valid_for_delta, network_id, identity.address());
        com.signed_by = self.capability.signer_address();
        let message = com.to_canonical_form()?;
        com.signature = self.capability.sign(&message)?;
        debug!("signed membership certificate for {} on {:016x}", com.subject, network_id);
        Ok(com)
    }

    /// Sign a certificate of ownership of `thing` for `owner`
    pub fn sign_ownership(
        &self,
        network_id: u64,
        timestamp: i64,
        owner: Address,
        sequence_number: u32,
        thing: InetAddress,
    ) -> Result<CertificateOfOwnership, SignError> {
        let mut coo = CertificateOfOwnership::new(network_id, timestamp, owner, sequence_number);
        coo.add_thing(thing)
            .map_err(|e| SignError::Encoding(e.to_string()))?;
        coo.signed_by = self.capability.signer_address();
        let message = coo.to_canonical_form()?;
        coo.signature = self.capability.sign(&message)?;
        debug!("signed ownership certificate for {} on {:016x}", owner, network_id);
        Ok(coo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_signature_verifies() {
        let controller = Identity::generate();
        let member = Identity::generate().public_only();
        let signer = CredentialSigner::new(Arc::new(controller.clone()));

        let com = signer.sign_membership(0x0123456789abcdef, 1_000, 1_800_000, &member).unwrap();
        assert_eq!(com.subject, member.address());
        assert_eq!(com.signed_by, controller.address());
        assert_eq!(com.issued_at, 1_000);
        assert_eq!(com.valid_for_delta, 1_800_000);
        assert!(com.verify(&controller.public_only()));

        let mut tampered = com.clone();
        tampered.valid_for_delta += 1;
        assert!(!tampered.verify(&controller));
        assert!(!com.verify(&member));
    }

    #[test]
    fn test_ownership_signature_verifies() {
        let controller = Identity::generate();
        let signer = CredentialSigner::new(Arc::new(controller.clone()));
        let thing: InetAddress = "fd00::1/88".parse().unwrap();

        let coo = signer.sign_ownership(7, 1_000, Address::new(0x42), 1, thing).unwrap();
        assert_eq!(coo.things.len(), 1);
        assert!(coo.owns(&thing));
        assert_eq!(coo.sequence_number, 1);
        assert!(coo.verify(&controller));
    }

    #[test]
    fn test_public_identity_cannot_sign() {
        let verify_only = Identity::generate().public_only();
        let signer = CredentialSigner::new(Arc::new(verify_only));
        let member = Identity::generate();

        let result = signer.sign_membership(7, 1_000, 10, &member);
        assert!(matches!(result, Err(SignError::Capability(_))));
    }
}
