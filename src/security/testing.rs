//! Shared fixtures for security tests: deterministic stand-ins for the
//! cryptographic seam.
//!
//! The mock "signature" of `bytes` under a key is
//! `sha256(public_bits || bytes)`, with `public_bits` derived from the key
//! name. Chain verification then works exactly as with real keys: a parent
//! certificate's content are the bits that verify its child.

use sha2::{Digest, Sha256};

use crate::clock;
use crate::security::{
    CertificateV2, KeyChain, KeyChainError, PibMemory, SignBackend, SignatureVerifier,
};
use crate::types::{Blob, KeyLocator, Name, Signature, SignatureParams, ValidityPeriod};

pub(crate) fn mock_public_key_bits(key_name: &Name) -> Blob {
    let digest: [u8; 32] =
        Sha256::digest(format!("ndn-mock-key:{}", key_name.to_uri(false))).into();
    Blob::from(digest.to_vec())
}

/// Deterministic signing backend keyed only by the key name.
pub(crate) struct MockSignBackend;

impl SignBackend for MockSignBackend {
    fn generate_key(&mut self, key_name: &Name) -> Result<Blob, KeyChainError> {
        Ok(mock_public_key_bits(key_name))
    }

    fn signature_template(&self, key_name: &Name) -> Result<Signature, KeyChainError> {
        Ok(Signature::Sha256WithRsa(SignatureParams::new(KeyLocator::KeyName(
            key_name.clone(),
        ))))
    }

    fn sign(&self, signed_portion: &[u8], key_name: &Name) -> Result<Blob, KeyChainError> {
        let mut hasher = Sha256::new();
        hasher.update(mock_public_key_bits(key_name).as_ref());
        hasher.update(signed_portion);
        let digest: [u8; 32] = hasher.finalize().into();
        Ok(Blob::from(digest.to_vec()))
    }
}

/// The verifier matching [`MockSignBackend`].
pub(crate) struct MockVerifier;

impl SignatureVerifier for MockVerifier {
    fn verify(&self, signature: &Signature, signed_portion: &[u8], public_key_bits: &[u8]) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(public_key_bits);
        hasher.update(signed_portion);
        let digest: [u8; 32] = hasher.finalize().into();
        signature.signature().as_ref() == digest
    }
}

pub(crate) fn key_chain() -> KeyChain {
    KeyChain::new(Box::new(PibMemory::new()), Box::new(MockSignBackend))
}

/// A key chain holding one identity, plus its certificate name.
pub(crate) fn key_chain_with_identity(identity_uri: &str) -> (KeyChain, Name) {
    let mut key_chain = key_chain();
    let certificate = key_chain
        .create_identity(&Name::from_uri(identity_uri).expect("fixture identity URI"))
        .expect("fixture identity");
    let name = certificate.name().clone();
    (key_chain, name)
}

/// A fresh self-signed certificate for the identity.
pub(crate) fn self_signed_certificate(identity_uri: &str) -> CertificateV2 {
    let mut key_chain = key_chain();
    key_chain
        .create_identity(&Name::from_uri(identity_uri).expect("fixture identity URI"))
        .expect("fixture identity")
}

/// A self-signed certificate with an explicit validity window.
pub(crate) fn certificate_valid_between(
    identity_uri: &str,
    not_before: u64,
    not_after: u64,
) -> CertificateV2 {
    let mut key_chain = key_chain();
    let base = key_chain
        .create_identity(&Name::from_uri(identity_uri).expect("fixture identity URI"))
        .expect("fixture identity");
    let key_name = base.key_name();
    key_chain
        .issue_certificate(
            &key_name,
            "window",
            &key_name,
            ValidityPeriod::new(not_before, not_after),
        )
        .expect("fixture certificate")
}

/// A certificate for a fresh key under `identity_uri`, signed by
/// `signer_key` from `signer`'s key chain. Returns the certificate; the
/// subject key also lands in `signer`'s PIB so further children can chain
/// from it.
pub(crate) fn issue_child_certificate(
    signer: &mut KeyChain,
    signer_key: &Name,
    identity_uri: &str,
) -> CertificateV2 {
    let identity = Name::from_uri(identity_uri).expect("fixture identity URI");
    let mut key_name = identity.clone();
    key_name.append_str("KEY");
    key_name.append_str("k1");
    let bits = mock_public_key_bits(&key_name);
    signer.pib_mut().add_key(&identity, &key_name, bits);
    let now = clock::now_ms();
    signer
        .issue_certificate(
            &key_name,
            "parent",
            signer_key,
            ValidityPeriod::new(now.saturating_sub(3_600_000), now + 3_600_000),
        )
        .expect("fixture child certificate")
}
