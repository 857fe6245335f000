//! Version-2 NDN certificates.

use core::fmt;
use core::ops::Deref;

use crate::error::decode::MalformedSnafu;
use crate::error::DecodeError;
use crate::types::{Blob, ContentType, Data, MillisecondsSince1970, Name, ValidityPeriod};

/// A certificate: a Data packet named
/// `/<identity>/KEY/<key-id>/<issuer-id>/<version>`, with content-type KEY,
/// a public key as content, and a validity period in its signature.
#[derive(Clone, Eq, PartialEq)]
pub struct CertificateV2 {
    data: Data,
    validity: ValidityPeriod,
}

impl CertificateV2 {
    /// The number of trailing name components that follow the identity:
    /// `KEY`, key id, issuer id, and version.
    pub const MIN_CERT_NAME_LENGTH: usize = 4;

    /// Checks the certificate structure and wraps `data`.
    pub fn from_data(data: Data) -> Result<Self, DecodeError> {
        if !Self::is_valid_name(data.name()) {
            return MalformedSnafu {
                what: "certificate",
                reason: format!("name {} does not follow the KEY convention", data.name()),
            }
            .fail();
        }
        if data.meta_info().content_type() != ContentType::Key {
            return MalformedSnafu {
                what: "certificate",
                reason: "content type is not KEY".to_string(),
            }
            .fail();
        }
        if data.content().is_empty() {
            return MalformedSnafu {
                what: "certificate",
                reason: "no public key content".to_string(),
            }
            .fail();
        }
        let Some(validity) = data.signature().validity_period().copied() else {
            return MalformedSnafu {
                what: "certificate",
                reason: "signature carries no validity period".to_string(),
            }
            .fail();
        };
        Ok(Self { data, validity })
    }

    /// Decodes a certificate from a Data wire encoding.
    pub fn wire_decode(input: &[u8]) -> Result<Self, DecodeError> {
        Self::from_data(Data::wire_decode(input)?)
    }

    /// True if `name` has the certificate shape: at least four components
    /// with `KEY` fourth from the end.
    pub fn is_valid_name(name: &Name) -> bool {
        name.len() >= Self::MIN_CERT_NAME_LENGTH
            && name.get(-4).map(|c| c.value().as_ref()) == Some(b"KEY")
    }

    /// The key name: everything through the key id.
    pub fn key_name(&self) -> Name {
        self.data.name().get_prefix(-2)
    }

    /// The identity this certificate belongs to: everything before `KEY`.
    pub fn identity(&self) -> Name {
        self.data.name().get_prefix(-(Self::MIN_CERT_NAME_LENGTH as isize))
    }

    pub fn key_id(&self) -> &crate::types::Component {
        // The name shape was checked at construction.
        &self.data.name().components()[self.data.name().len() - 3]
    }

    pub fn issuer_id(&self) -> &crate::types::Component {
        &self.data.name().components()[self.data.name().len() - 2]
    }

    /// The DER-encoded public key this certificate vouches for.
    pub fn public_key(&self) -> &Blob {
        self.data.content()
    }

    pub fn validity_period(&self) -> &ValidityPeriod {
        &self.validity
    }

    /// True if `now` falls inside the validity period.
    pub fn is_valid_at(&self, now: MillisecondsSince1970) -> bool {
        self.validity.is_valid_at(now)
    }

    pub fn as_data(&self) -> &Data {
        &self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    /// The identity part of a certificate name.
    pub fn extract_identity_from_cert_name(name: &Name) -> Result<Name, DecodeError> {
        if !Self::is_valid_name(name) {
            return MalformedSnafu {
                what: "certificate name",
                reason: format!("{name} does not follow the KEY convention"),
            }
            .fail();
        }
        Ok(name.get_prefix(-(Self::MIN_CERT_NAME_LENGTH as isize)))
    }

    /// The key name part of a certificate name. Accepts a bare key name
    /// too, where `KEY` is second from the end.
    pub fn extract_key_name_from_cert_name(name: &Name) -> Result<Name, DecodeError> {
        if Self::is_valid_name(name) {
            return Ok(name.get_prefix(-2));
        }
        if name.len() >= 2 && name.get(-2).map(|c| c.value().as_ref()) == Some(b"KEY") {
            return Ok(name.clone());
        }
        MalformedSnafu {
            what: "certificate name",
            reason: format!("{name} holds no KEY component"),
        }
        .fail()
    }
}

impl Deref for CertificateV2 {
    type Target = Data;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl fmt::Debug for CertificateV2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateV2({})", self.data.name())
    }
}

impl fmt::Display for CertificateV2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate name:")?;
        writeln!(f, "  {}", self.data.name())?;
        writeln!(f, "Validity:")?;
        writeln!(
            f,
            "  NotBefore: {}",
            ValidityPeriod::to_iso_string(self.validity.not_before())
        )?;
        writeln!(
            f,
            "  NotAfter: {}",
            ValidityPeriod::to_iso_string(self.validity.not_after())
        )?;
        write!(f, "Signature type: {}", self.data.signature().type_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyLocator, Signature, SignatureParams};

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn certificate_data(uri: &str) -> Data {
        let mut data = Data::new(name(uri));
        data.meta_info_mut().set_content_type(ContentType::Key);
        data.set_content(vec![0x30, 0x82, 0x01, 0x0A]);
        let mut params = SignatureParams::new(KeyLocator::KeyName(name("/issuer/KEY/k0")));
        params.set_validity_period(ValidityPeriod::new(1000, 2000));
        data.set_signature(Signature::Sha256WithRsa(params));
        data
    }

    #[test]
    fn accepts_the_key_name_convention() {
        let certificate =
            CertificateV2::from_data(certificate_data("/alice/site/KEY/k1/self/v7")).unwrap();
        assert_eq!(name("/alice/site"), certificate.identity());
        assert_eq!(name("/alice/site/KEY/k1"), certificate.key_name());
        assert_eq!(b"k1", certificate.key_id().value().as_ref());
        assert_eq!(b"self", certificate.issuer_id().value().as_ref());
        assert!(certificate.is_valid_at(1500));
        assert!(!certificate.is_valid_at(2001));
    }

    #[test]
    fn rejects_malformed_certificates() {
        // Name without KEY.
        assert!(CertificateV2::from_data(certificate_data("/a/b/c/d/e")).is_err());
        // Name too short.
        assert!(CertificateV2::from_data(certificate_data("/KEY/k/i")).is_err());
        // Wrong content type.
        let mut data = certificate_data("/alice/KEY/k1/self/v7");
        data.meta_info_mut().set_content_type(ContentType::Blob);
        assert!(CertificateV2::from_data(data).is_err());
        // Missing validity period.
        let mut data = certificate_data("/alice/KEY/k1/self/v7");
        data.set_signature(Signature::Sha256WithRsa(SignatureParams::new(
            KeyLocator::KeyName(name("/issuer/KEY/k0")),
        )));
        assert!(CertificateV2::from_data(data).is_err());
    }

    #[test]
    fn name_helpers() {
        assert!(CertificateV2::is_valid_name(&name("/a/KEY/k/i/v")));
        assert!(!CertificateV2::is_valid_name(&name("/a/b/k/i/v")));
        assert_eq!(
            name("/a"),
            CertificateV2::extract_identity_from_cert_name(&name("/a/KEY/k/i/v")).unwrap()
        );
        assert_eq!(
            name("/a/KEY/k"),
            CertificateV2::extract_key_name_from_cert_name(&name("/a/KEY/k/i/v")).unwrap()
        );
        assert_eq!(
            name("/a/KEY/k"),
            CertificateV2::extract_key_name_from_cert_name(&name("/a/KEY/k")).unwrap()
        );
        assert!(CertificateV2::extract_key_name_from_cert_name(&name("/a/b")).is_err());
    }
}
