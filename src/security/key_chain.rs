//! Signing keys to packets: the KeyChain contract.

use snafu::{ResultExt, Snafu};

use crate::clock;
use crate::error::{EncodeError, PibError};
use crate::security::{CertificateV2, PibImpl};
use crate::types::{
    Blob, Component, ContentType, Data, Interest, Name, Signature, ValidityPeriod,
};
use crate::wire::default_wire_format;

/// An error from a signing operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum KeyChainError {
    #[snafu(display("PIB lookup failed: {source}"))]
    Pib { source: PibError },

    #[snafu(display("cannot encode packet for signing: {source}"))]
    Encode { source: EncodeError },

    #[snafu(display("signing backend failed: {message}"))]
    Backend { message: String },

    #[snafu(display("produced certificate is not well formed: {message}"))]
    BadCertificate { message: String },
}

/// The opaque cryptographic seam: key generation and raw signing.
///
/// The crate treats sign as `sign(bytes, key) -> bytes`; concrete RSA,
/// ECDSA or HMAC implementations live with the application.
pub trait SignBackend {
    /// Creates a key pair, returning the DER-encoded public key bits.
    fn generate_key(&mut self, key_name: &Name) -> Result<Blob, KeyChainError>;

    /// A signature of the right variant for this key, with its key locator
    /// filled in and empty signature bits.
    fn signature_template(&self, key_name: &Name) -> Result<Signature, KeyChainError>;

    /// Signs the signed portion of an encoding with the named key.
    fn sign(&self, signed_portion: &[u8], key_name: &Name) -> Result<Blob, KeyChainError>;
}

/// Signs Data packets and Interests with keys from a [`PibImpl`], using a
/// [`SignBackend`] for the cryptography.
pub struct KeyChain {
    pib: Box<dyn PibImpl>,
    backend: Box<dyn SignBackend>,
}

impl KeyChain {
    pub fn new(pib: Box<dyn PibImpl>, backend: Box<dyn SignBackend>) -> Self {
        Self { pib, backend }
    }

    pub fn pib(&self) -> &dyn PibImpl {
        self.pib.as_ref()
    }

    pub fn pib_mut(&mut self) -> &mut dyn PibImpl {
        self.pib.as_mut()
    }

    /// Creates an identity with a fresh key and a self-signed certificate,
    /// returning the certificate. The first identity becomes the default.
    pub fn create_identity(&mut self, identity: &Name) -> Result<CertificateV2, KeyChainError> {
        let mut key_name = identity.clone();
        key_name.append_str("KEY");
        key_name.append(Component::new(rand::random::<[u8; 8]>().to_vec()));
        let key_bits = self.backend.generate_key(&key_name)?;
        self.pib.add_key(identity, &key_name, key_bits);
        let now = clock::now_ms();
        let validity = ValidityPeriod::new(
            now.saturating_sub(3_600_000),
            now + 20 * 365 * 24 * 3_600_000,
        );
        let certificate = self.issue_certificate(&key_name, "self", &key_name, validity)?;
        self.pib
            .add_certificate(certificate.clone())
            .context(PibSnafu)?;
        Ok(certificate)
    }

    /// Issues a certificate for `key_name`, signed by `signer_key_name`
    /// (self-signed when they are the same key).
    pub fn issue_certificate(
        &mut self,
        key_name: &Name,
        issuer_id: &str,
        signer_key_name: &Name,
        validity: ValidityPeriod,
    ) -> Result<CertificateV2, KeyChainError> {
        let key_bits = self.pib.get_key_bits(key_name).context(PibSnafu)?;
        let mut certificate_name = key_name.clone();
        certificate_name.append_str(issuer_id);
        certificate_name.append_version(clock::now_ms());
        let mut data = Data::new(certificate_name);
        data.meta_info_mut().set_content_type(ContentType::Key);
        data.meta_info_mut().set_freshness_period(3_600_000);
        data.set_content(key_bits);

        let mut signature = self.backend.signature_template(signer_key_name)?;
        match signature.params_mut() {
            Some(params) => params.set_validity_period(validity),
            None => {
                return BackendSnafu {
                    message: "certificate signatures need a key-carrying type".to_string(),
                }
                .fail()
            }
        }
        self.sign_data_with_signature(&mut data, signature, signer_key_name)?;
        CertificateV2::from_data(data)
            .map_err(|error| KeyChainError::BadCertificate { message: error.to_string() })
    }

    /// Signs `data` with the key named by `certificate_name` (a full
    /// certificate name or a bare key name).
    pub fn sign_data(
        &mut self,
        data: &mut Data,
        certificate_name: &Name,
    ) -> Result<(), KeyChainError> {
        let key_name = CertificateV2::extract_key_name_from_cert_name(certificate_name)
            .map_err(|error| KeyChainError::Backend { message: error.to_string() })?;
        let signature = self.backend.signature_template(&key_name)?;
        self.sign_data_with_signature(data, signature, &key_name)
    }

    /// Signs `data` with an integrity-only SHA-256 digest.
    pub fn sign_data_with_digest_sha256(&mut self, data: &mut Data) -> Result<(), KeyChainError> {
        use sha2::{Digest, Sha256};
        data.set_signature(Signature::DigestSha256 { signature: Blob::default() });
        let wire = data.wire_encode().context(EncodeSnafu)?;
        let digest: [u8; 32] = Sha256::digest(wire.signed_portion()).into();
        data.signature_mut().set_signature(digest.to_vec());
        Ok(())
    }

    fn sign_data_with_signature(
        &mut self,
        data: &mut Data,
        mut signature: Signature,
        key_name: &Name,
    ) -> Result<(), KeyChainError> {
        data.set_signature(signature.clone());
        let wire = data.wire_encode().context(EncodeSnafu)?;
        let bits = self.backend.sign(wire.signed_portion(), key_name)?;
        signature.set_signature(bits);
        data.set_signature(signature);
        Ok(())
    }

    /// Signs an Interest by appending SignatureInfo and SignatureValue as
    /// its two final name components, covering everything from the first
    /// component through the SignatureInfo.
    pub fn sign_interest(
        &mut self,
        interest: &mut Interest,
        certificate_name: &Name,
    ) -> Result<(), KeyChainError> {
        let key_name = CertificateV2::extract_key_name_from_cert_name(certificate_name)
            .map_err(|error| KeyChainError::Backend { message: error.to_string() })?;
        let format = default_wire_format();
        let mut signature = self.backend.signature_template(&key_name)?;
        let info = format.encode_signature_info(&signature).context(EncodeSnafu)?;
        interest.name_mut().append(Component::new(info.to_vec()));
        // An empty placeholder stands in for SignatureValue so the signed
        // portion ends exactly after the SignatureInfo component.
        interest.name_mut().append(Component::new(Vec::new()));
        let wire = interest.wire_encode().context(EncodeSnafu)?;
        let bits = self.backend.sign(wire.signed_portion(), &key_name)?;
        signature.set_signature(bits);
        let value = format.encode_signature_value(&signature).context(EncodeSnafu)?;
        let mut signed_name = interest.name().get_prefix(-1);
        signed_name.append(Component::new(value.to_vec()));
        interest.set_name(signed_name);
        Ok(())
    }

    /// The default certificate name: default identity, default key,
    /// default certificate.
    pub fn default_certificate_name(&self) -> Result<Name, KeyChainError> {
        let identity = self.pib.get_default_identity().context(PibSnafu)?;
        let key_name = self
            .pib
            .get_default_key_of_identity(&identity)
            .context(PibSnafu)?;
        let certificate = self
            .pib
            .get_default_certificate_of_key(&key_name)
            .context(PibSnafu)?;
        Ok(certificate.name().clone())
    }
}
