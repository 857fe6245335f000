//! References to the key that produced a signature.

use crate::types::{Blob, Name};

/// A reference to a signing key, carried in a signature's info block or in
/// an Interest's publisher-key selector.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum KeyLocator {
    /// No locator present.
    #[default]
    None,
    /// The name of the key or certificate.
    KeyName(Name),
    /// A digest identifying the key.
    KeyDigest(Blob),
}

impl KeyLocator {
    pub fn is_none(&self) -> bool {
        matches!(self, KeyLocator::None)
    }

    /// The key name, when this locator holds one.
    pub fn key_name(&self) -> Option<&Name> {
        match self {
            KeyLocator::KeyName(name) => Some(name),
            _ => None,
        }
    }

    /// The key digest, when this locator holds one.
    pub fn key_digest(&self) -> Option<&Blob> {
        match self {
            KeyLocator::KeyDigest(digest) => Some(digest),
            _ => None,
        }
    }
}

impl From<Name> for KeyLocator {
    fn from(name: Name) -> Self {
        KeyLocator::KeyName(name)
    }
}
