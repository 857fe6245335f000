//! The typed error delivered to a validation failure callback.

use core::fmt;

/// The reason a packet failed validation.
///
/// Codes at `USER_MIN` and above are reserved for applications layering
/// their own policies on top of the built-in ones.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ValidationErrorCode {
    NoError,
    InvalidSignature,
    NoSignature,
    CannotRetrieveCertificate,
    ExpiredCertificate,
    LoopDetected,
    MalformedCertificate,
    ExceededDepthLimit,
    InvalidKeyLocator,
    PolicyError,
    ImplementationError,
    /// An application-defined code, `USER_MIN` or above.
    User(u32),
}

impl ValidationErrorCode {
    /// The lowest code available to application-defined errors.
    pub const USER_MIN: u32 = 256;

    /// The numeric value of this code.
    pub fn number(self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::InvalidSignature => 1,
            Self::NoSignature => 2,
            Self::CannotRetrieveCertificate => 3,
            Self::ExpiredCertificate => 4,
            Self::LoopDetected => 5,
            Self::MalformedCertificate => 6,
            Self::ExceededDepthLimit => 7,
            Self::InvalidKeyLocator => 8,
            Self::PolicyError => 9,
            Self::ImplementationError => 255,
            Self::User(code) => code,
        }
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "no error",
            Self::InvalidSignature => "invalid signature",
            Self::NoSignature => "missing signature",
            Self::CannotRetrieveCertificate => "cannot retrieve certificate",
            Self::ExpiredCertificate => "certificate expired",
            Self::LoopDetected => "loop detected in certificate chain",
            Self::MalformedCertificate => "malformed certificate",
            Self::ExceededDepthLimit => "exceeded validation depth limit",
            Self::InvalidKeyLocator => "invalid key locator",
            Self::PolicyError => "policy error",
            Self::ImplementationError => "internal implementation error",
            Self::User(code) => return write!(f, "user-defined error {code}"),
        };
        f.write_str(name)
    }
}

/// A validation failure: a typed code plus free-form detail.
///
/// Delivered to the failure callback of a validation exactly once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    code: ValidationErrorCode,
    info: String,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, info: impl Into<String>) -> Self {
        Self { code, info: info.into() }
    }

    pub fn code(&self) -> ValidationErrorCode {
        self.code
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.info.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.info)
        }
    }
}

impl std::error::Error for ValidationError {}
