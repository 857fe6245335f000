#![doc = include_str!("../README.md")]

#[cfg(test)]
macro_rules! round_trip {
    ($encode:ident, $decode:ident, $value:expr, $expected:expr) => {{
        let value = $value;
        let expected: &[u8] = $expected;
        let format = crate::wire::TlvWireFormat;
        let encoding = match format.$encode(&value) {
            Ok(encoding) => {
                pretty_assertions::assert_eq!(expected, encoding.as_ref());
                encoding
            }
            Err(error) => {
                panic!("Unexpected encoding error: {:?}", error);
            }
        };
        let decoded = format.$decode(encoding.as_ref()).unwrap();
        pretty_assertions::assert_eq!(value, decoded);
    }};
}

#[cfg(test)]
macro_rules! decode_error {
    ($decode:ident, $value:expr) => {{
        match crate::wire::TlvWireFormat.$decode($value) {
            Ok(_) => {
                panic!("Unexpected decoding success!");
            }
            Err(_) => {
                // Expected a decoding error, so we're good!
            }
        }
    }};
}

pub(crate) mod clock;
pub mod error;
pub mod node;
pub mod security;
pub mod tlv;
pub mod transport;
pub mod types;
pub mod wire;

#[doc(inline)]
pub use self::{
    node::Node,
    types::{Blob, Data, Interest, Name},
    wire::WireFormat,
};

/// A prelude containing the wire-format trait and all types defined in the
/// [`types`] module.
pub mod prelude {
    pub use crate::{
        types::*,
        wire::{TlvWireFormat, WireFormat},
    };
}
