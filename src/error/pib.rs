//! Errors raised by public-information-base storage operations.

use snafu::Snafu;

use crate::types::Name;

/// An error from a PIB storage operation, e.g. looking up an identity, key
/// or certificate that does not exist.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum PibError {
    #[snafu(display("identity {identity} does not exist"))]
    NoIdentity { identity: Name },

    #[snafu(display("key {key} does not exist"))]
    NoKey { key: Name },

    #[snafu(display("certificate {certificate} does not exist"))]
    NoCertificate { certificate: Name },

    #[snafu(display("no default {scope} is set"))]
    NoDefault { scope: &'static str },

    /// A certificate was added under a key it does not belong to.
    #[snafu(display("certificate {certificate} does not match key {key}"))]
    CertificateKeyMismatch { certificate: Name, key: Name },
}
