//! Signature variants and the validity period they may carry.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::DecodeError;
use crate::types::{Blob, KeyLocator, MillisecondsSince1970};

/// The period during which a certificate's signature is considered valid.
///
/// Times are milliseconds since the UNIX epoch; on the wire they appear as
/// compact ISO 8601 timestamps with one-second granularity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ValidityPeriod {
    not_before: MillisecondsSince1970,
    not_after: MillisecondsSince1970,
}

impl ValidityPeriod {
    pub fn new(not_before: MillisecondsSince1970, not_after: MillisecondsSince1970) -> Self {
        Self { not_before, not_after }
    }

    pub fn not_before(&self) -> MillisecondsSince1970 {
        self.not_before
    }

    pub fn not_after(&self) -> MillisecondsSince1970 {
        self.not_after
    }

    /// True if `now` falls within the period.
    pub fn is_valid_at(&self, now: MillisecondsSince1970) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Renders a timestamp in the compact ISO form used on the wire,
    /// e.g. `20181031T235959`.
    pub(crate) fn to_iso_string(ms: MillisecondsSince1970) -> String {
        let time = DateTime::<Utc>::from_timestamp_millis(ms as i64)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        time.format("%Y%m%dT%H%M%S").to_string()
    }

    /// Parses a compact ISO timestamp into milliseconds since the epoch.
    pub(crate) fn from_iso_string(text: &str) -> Result<MillisecondsSince1970, DecodeError> {
        let time = NaiveDateTime::parse_from_str(text, "%Y%m%dT%H%M%S")
            .map_err(|_| DecodeError::ValueOutOfRange { field: "validity period timestamp" })?;
        let ms = time.and_utc().timestamp_millis();
        if ms < 0 {
            return Err(DecodeError::ValueOutOfRange { field: "validity period timestamp" });
        }
        Ok(ms as MillisecondsSince1970)
    }
}

/// The signer-specific fields shared by the key-based signature types.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignatureParams {
    key_locator: KeyLocator,
    validity_period: Option<ValidityPeriod>,
    signature: Blob,
}

impl SignatureParams {
    pub fn new(key_locator: KeyLocator) -> Self {
        Self { key_locator, validity_period: None, signature: Blob::default() }
    }

    pub fn key_locator(&self) -> &KeyLocator {
        &self.key_locator
    }

    pub fn set_key_locator(&mut self, key_locator: KeyLocator) {
        self.key_locator = key_locator;
    }

    pub fn validity_period(&self) -> Option<&ValidityPeriod> {
        self.validity_period.as_ref()
    }

    pub fn set_validity_period(&mut self, period: impl Into<Option<ValidityPeriod>>) {
        self.validity_period = period.into();
    }

    pub fn signature(&self) -> &Blob {
        &self.signature
    }

    pub fn set_signature(&mut self, signature: impl Into<Blob>) {
        self.signature = signature.into();
    }
}

/// A signature whose type code is not built in.
///
/// The raw SignatureInfo TLV is kept so the packet re-encodes bit-exactly.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GenericSignature {
    type_code: u64,
    info_wire: Blob,
    signature: Blob,
}

impl GenericSignature {
    pub fn new(type_code: u64, info_wire: impl Into<Blob>) -> Self {
        Self { type_code, info_wire: info_wire.into(), signature: Blob::default() }
    }

    pub fn type_code(&self) -> u64 {
        self.type_code
    }

    /// The entire SignatureInfo TLV as received.
    pub fn info_wire(&self) -> &Blob {
        &self.info_wire
    }

    pub fn signature(&self) -> &Blob {
        &self.signature
    }

    pub fn set_signature(&mut self, signature: impl Into<Blob>) {
        self.signature = signature.into();
    }
}

/// The signature carried by a Data packet or appended to a signed Interest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Signature {
    Sha256WithRsa(SignatureParams),
    Sha256WithEcdsa(SignatureParams),
    HmacWithSha256(SignatureParams),
    /// An integrity-only SHA-256 digest over the signed portion.
    DigestSha256 { signature: Blob },
    /// Any other signature type, kept for round-tripping.
    Generic(GenericSignature),
}

impl Signature {
    /// The SignatureType code of the DigestSha256 variant.
    pub const TYPE_DIGEST_SHA256: u64 = 0;
    /// The SignatureType code of the Sha256WithRsa variant.
    pub const TYPE_SHA256_WITH_RSA: u64 = 1;
    /// The SignatureType code of the Sha256WithEcdsa variant.
    pub const TYPE_SHA256_WITH_ECDSA: u64 = 3;
    /// The SignatureType code of the HmacWithSha256 variant.
    pub const TYPE_HMAC_WITH_SHA256: u64 = 4;

    /// The numeric SignatureType of this variant.
    pub fn type_code(&self) -> u64 {
        match self {
            Signature::DigestSha256 { .. } => Self::TYPE_DIGEST_SHA256,
            Signature::Sha256WithRsa(_) => Self::TYPE_SHA256_WITH_RSA,
            Signature::Sha256WithEcdsa(_) => Self::TYPE_SHA256_WITH_ECDSA,
            Signature::HmacWithSha256(_) => Self::TYPE_HMAC_WITH_SHA256,
            Signature::Generic(generic) => generic.type_code(),
        }
    }

    /// The key locator, for the variants that carry one.
    pub fn key_locator(&self) -> &KeyLocator {
        match self.params() {
            Some(params) => params.key_locator(),
            None => &KeyLocator::None,
        }
    }

    /// The validity period, for the variants that carry one.
    pub fn validity_period(&self) -> Option<&ValidityPeriod> {
        self.params().and_then(SignatureParams::validity_period)
    }

    /// The signature bits.
    pub fn signature(&self) -> &Blob {
        match self {
            Signature::DigestSha256 { signature } => signature,
            Signature::Generic(generic) => generic.signature(),
            Signature::Sha256WithRsa(params)
            | Signature::Sha256WithEcdsa(params)
            | Signature::HmacWithSha256(params) => params.signature(),
        }
    }

    pub fn set_signature(&mut self, bits: impl Into<Blob>) {
        match self {
            Signature::DigestSha256 { signature } => *signature = bits.into(),
            Signature::Generic(generic) => generic.set_signature(bits),
            Signature::Sha256WithRsa(params)
            | Signature::Sha256WithEcdsa(params)
            | Signature::HmacWithSha256(params) => params.set_signature(bits),
        }
    }

    pub fn params(&self) -> Option<&SignatureParams> {
        match self {
            Signature::Sha256WithRsa(params)
            | Signature::Sha256WithEcdsa(params)
            | Signature::HmacWithSha256(params) => Some(params),
            _ => None,
        }
    }

    pub fn params_mut(&mut self) -> Option<&mut SignatureParams> {
        match self {
            Signature::Sha256WithRsa(params)
            | Signature::Sha256WithEcdsa(params)
            | Signature::HmacWithSha256(params) => Some(params),
            _ => None,
        }
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::DigestSha256 { signature: Blob::default() }
    }
}
