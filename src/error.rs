//! Error types for encoding, decoding, validation, and key storage.

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod pib;
mod validation;

pub use decode::DecodeError;
pub use encode::EncodeError;
pub use pib::PibError;
pub use validation::{ValidationError, ValidationErrorCode};

use snafu::Snafu;

/// An illegal parameter was passed to a constructor or setter.
#[derive(Debug, Snafu)]
#[snafu(display("invalid argument: {message}"))]
pub struct InvalidArgument {
    /// What was wrong with the argument.
    pub message: String,
}

impl InvalidArgument {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
