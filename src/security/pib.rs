//! The public information base: identities, keys, and certificates.

use std::collections::BTreeMap;

use crate::error::pib::{
    CertificateKeyMismatchSnafu, NoCertificateSnafu, NoDefaultSnafu, NoIdentitySnafu, NoKeySnafu,
};
use crate::error::PibError;
use crate::security::CertificateV2;
use crate::types::{Blob, Name};

/// Abstract storage for identities, their keys, and key certificates.
///
/// Only the in-memory implementation ships with the crate; persistent
/// backends implement the same operations outside it.
pub trait PibImpl {
    fn has_identity(&self, identity: &Name) -> bool;
    fn add_identity(&mut self, identity: &Name);
    /// Removes the identity together with its keys and their certificates.
    fn remove_identity(&mut self, identity: &Name);
    fn clear_identities(&mut self);
    fn get_default_identity(&self) -> Result<Name, PibError>;
    fn set_default_identity(&mut self, identity: &Name);

    fn has_key(&self, key_name: &Name) -> bool;
    /// Adds a key for the identity, adding the identity if needed.
    fn add_key(&mut self, identity: &Name, key_name: &Name, key_bits: Blob);
    /// Removes the key and its certificates.
    fn remove_key(&mut self, key_name: &Name);
    fn get_key_bits(&self, key_name: &Name) -> Result<Blob, PibError>;
    fn get_keys_of_identity(&self, identity: &Name) -> Vec<Name>;
    fn get_default_key_of_identity(&self, identity: &Name) -> Result<Name, PibError>;
    fn set_default_key_of_identity(
        &mut self,
        identity: &Name,
        key_name: &Name,
    ) -> Result<(), PibError>;

    fn has_certificate(&self, certificate_name: &Name) -> bool;
    /// Adds a certificate, implicitly adding its key (with the public key
    /// bits from the certificate content) and identity.
    fn add_certificate(&mut self, certificate: CertificateV2) -> Result<(), PibError>;
    fn remove_certificate(&mut self, certificate_name: &Name);
    fn get_certificate(&self, certificate_name: &Name) -> Result<CertificateV2, PibError>;
    fn get_certificates_of_key(&self, key_name: &Name) -> Vec<Name>;
    fn get_default_certificate_of_key(&self, key_name: &Name) -> Result<CertificateV2, PibError>;
    fn set_default_certificate_of_key(
        &mut self,
        key_name: &Name,
        certificate_name: &Name,
    ) -> Result<(), PibError>;
}

/// The in-memory PIB.
#[derive(Default)]
pub struct PibMemory {
    identities: Vec<Name>,
    default_identity: Option<Name>,
    keys: BTreeMap<Name, KeyEntry>,
    default_keys: BTreeMap<Name, Name>,
    certificates: BTreeMap<Name, CertificateV2>,
    default_certificates: BTreeMap<Name, Name>,
}

struct KeyEntry {
    identity: Name,
    bits: Blob,
}

impl PibMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PibImpl for PibMemory {
    fn has_identity(&self, identity: &Name) -> bool {
        self.identities.contains(identity)
    }

    fn add_identity(&mut self, identity: &Name) {
        if !self.identities.contains(identity) {
            self.identities.push(identity.clone());
        }
        if self.default_identity.is_none() {
            self.default_identity = Some(identity.clone());
        }
    }

    fn remove_identity(&mut self, identity: &Name) {
        self.identities.retain(|i| i != identity);
        if self.default_identity.as_ref() == Some(identity) {
            self.default_identity = None;
        }
        let keys = self.get_keys_of_identity(identity);
        for key in keys {
            self.remove_key(&key);
        }
    }

    fn clear_identities(&mut self) {
        self.identities.clear();
        self.default_identity = None;
        self.keys.clear();
        self.default_keys.clear();
        self.certificates.clear();
        self.default_certificates.clear();
    }

    fn get_default_identity(&self) -> Result<Name, PibError> {
        self.default_identity
            .clone()
            .ok_or_else(|| NoDefaultSnafu { scope: "identity" }.build())
    }

    fn set_default_identity(&mut self, identity: &Name) {
        self.add_identity(identity);
        self.default_identity = Some(identity.clone());
    }

    fn has_key(&self, key_name: &Name) -> bool {
        self.keys.contains_key(key_name)
    }

    fn add_key(&mut self, identity: &Name, key_name: &Name, key_bits: Blob) {
        self.add_identity(identity);
        self.keys
            .insert(key_name.clone(), KeyEntry { identity: identity.clone(), bits: key_bits });
        self.default_keys
            .entry(identity.clone())
            .or_insert_with(|| key_name.clone());
    }

    fn remove_key(&mut self, key_name: &Name) {
        if let Some(entry) = self.keys.remove(key_name) {
            if self.default_keys.get(&entry.identity) == Some(key_name) {
                self.default_keys.remove(&entry.identity);
            }
        }
        let certificates = self.get_certificates_of_key(key_name);
        for certificate in certificates {
            self.remove_certificate(&certificate);
        }
        self.default_certificates.remove(key_name);
    }

    fn get_key_bits(&self, key_name: &Name) -> Result<Blob, PibError> {
        self.keys
            .get(key_name)
            .map(|entry| entry.bits.clone())
            .ok_or_else(|| NoKeySnafu { key: key_name.clone() }.build())
    }

    fn get_keys_of_identity(&self, identity: &Name) -> Vec<Name> {
        self.keys
            .iter()
            .filter(|(_, entry)| entry.identity == *identity)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn get_default_key_of_identity(&self, identity: &Name) -> Result<Name, PibError> {
        if !self.has_identity(identity) {
            return NoIdentitySnafu { identity: identity.clone() }.fail();
        }
        self.default_keys
            .get(identity)
            .cloned()
            .ok_or_else(|| NoDefaultSnafu { scope: "key" }.build())
    }

    fn set_default_key_of_identity(
        &mut self,
        identity: &Name,
        key_name: &Name,
    ) -> Result<(), PibError> {
        if !self.has_key(key_name) {
            return NoKeySnafu { key: key_name.clone() }.fail();
        }
        self.default_keys.insert(identity.clone(), key_name.clone());
        Ok(())
    }

    fn has_certificate(&self, certificate_name: &Name) -> bool {
        self.certificates.contains_key(certificate_name)
    }

    fn add_certificate(&mut self, certificate: CertificateV2) -> Result<(), PibError> {
        let key_name = certificate.key_name();
        let identity = certificate.identity();
        self.add_key(&identity, &key_name, certificate.public_key().clone());
        let certificate_name = certificate.name().clone();
        self.certificates.insert(certificate_name.clone(), certificate);
        self.default_certificates
            .entry(key_name)
            .or_insert(certificate_name);
        Ok(())
    }

    fn remove_certificate(&mut self, certificate_name: &Name) {
        if let Some(certificate) = self.certificates.remove(certificate_name) {
            let key_name = certificate.key_name();
            if self.default_certificates.get(&key_name) == Some(certificate_name) {
                self.default_certificates.remove(&key_name);
            }
        }
    }

    fn get_certificate(&self, certificate_name: &Name) -> Result<CertificateV2, PibError> {
        self.certificates
            .get(certificate_name)
            .cloned()
            .ok_or_else(|| NoCertificateSnafu { certificate: certificate_name.clone() }.build())
    }

    fn get_certificates_of_key(&self, key_name: &Name) -> Vec<Name> {
        self.certificates
            .values()
            .filter(|certificate| certificate.key_name() == *key_name)
            .map(|certificate| certificate.name().clone())
            .collect()
    }

    fn get_default_certificate_of_key(&self, key_name: &Name) -> Result<CertificateV2, PibError> {
        let certificate_name = self
            .default_certificates
            .get(key_name)
            .ok_or_else(|| NoDefaultSnafu { scope: "certificate" }.build())?;
        self.get_certificate(certificate_name)
    }

    fn set_default_certificate_of_key(
        &mut self,
        key_name: &Name,
        certificate_name: &Name,
    ) -> Result<(), PibError> {
        let certificate = self.get_certificate(certificate_name)?;
        if certificate.key_name() != *key_name {
            return CertificateKeyMismatchSnafu {
                certificate: certificate_name.clone(),
                key: key_name.clone(),
            }
            .fail();
        }
        self.default_certificates
            .insert(key_name.clone(), certificate_name.clone());
        Ok(())
    }
}
