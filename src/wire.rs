//! # Wire formats
//!
//! [`WireFormat`] is the packet-level codec seam. The production
//! implementation is [`TlvWireFormat`]; the legacy binary-XML format is kept
//! only as a stub that reports every operation as unsupported.

mod binary_xml;
mod tlv_format;

pub use binary_xml::BinaryXmlWireFormat;
pub use tlv_format::TlvWireFormat;

use core::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::sync::RwLock;

use crate::error::{DecodeError, EncodeError};
use crate::error::decode::UnsupportedFormatSnafu as UnsupportedDecodeSnafu;
use crate::error::encode::UnsupportedFormatSnafu;
use crate::types::{
    Blob, Component, ControlParameters, ControlResponse, Data, DelegationSet, Interest, LpPacket,
    Name, Signature, SignedBlob,
};

macro_rules! unsupported_encode {
    ($self:expr, $operation:literal) => {
        UnsupportedFormatSnafu { format: $self.name(), operation: $operation }.fail()
    };
}

macro_rules! unsupported_decode {
    ($self:expr, $operation:literal) => {
        UnsupportedDecodeSnafu { format: $self.name(), operation: $operation }.fail()
    };
}

/// A packet-level codec.
///
/// Every method has a default implementation that fails with an
/// unsupported-format error, so a format only implements what it supports.
/// Encoded Interests and Data carry the byte range their signature covers.
pub trait WireFormat: fmt::Debug + Send + Sync {
    /// A stable identifier for this format, used to key cached encodings.
    fn name(&self) -> &'static str;

    fn encode_name(&self, _name: &Name) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_name")
    }

    fn decode_name(&self, _input: &[u8]) -> Result<Name, DecodeError> {
        unsupported_decode!(self, "decode_name")
    }

    fn encode_interest(&self, _interest: &Interest) -> Result<SignedBlob, EncodeError> {
        unsupported_encode!(self, "encode_interest")
    }

    fn decode_interest(&self, _input: &[u8]) -> Result<Interest, DecodeError> {
        unsupported_decode!(self, "decode_interest")
    }

    fn encode_data(&self, _data: &Data) -> Result<SignedBlob, EncodeError> {
        unsupported_encode!(self, "encode_data")
    }

    fn decode_data(&self, _input: &[u8]) -> Result<Data, DecodeError> {
        unsupported_decode!(self, "decode_data")
    }

    fn encode_control_parameters(
        &self,
        _parameters: &ControlParameters,
    ) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_control_parameters")
    }

    fn decode_control_parameters(&self, _input: &[u8]) -> Result<ControlParameters, DecodeError> {
        unsupported_decode!(self, "decode_control_parameters")
    }

    fn encode_control_response(&self, _response: &ControlResponse) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_control_response")
    }

    fn decode_control_response(&self, _input: &[u8]) -> Result<ControlResponse, DecodeError> {
        unsupported_decode!(self, "decode_control_response")
    }

    /// Encodes a delegation set as a bare sequence of Delegation TLVs, the
    /// form used both inside a forwarding hint and as Link content.
    fn encode_delegation_set(&self, _set: &DelegationSet) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_delegation_set")
    }

    fn decode_delegation_set(&self, _input: &[u8]) -> Result<DelegationSet, DecodeError> {
        unsupported_decode!(self, "decode_delegation_set")
    }

    fn encode_lp_packet(&self, _packet: &LpPacket) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_lp_packet")
    }

    fn decode_lp_packet(&self, _input: &[u8]) -> Result<LpPacket, DecodeError> {
        unsupported_decode!(self, "decode_lp_packet")
    }

    fn encode_signature_info(&self, _signature: &Signature) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_signature_info")
    }

    fn encode_signature_value(&self, _signature: &Signature) -> Result<Blob, EncodeError> {
        unsupported_encode!(self, "encode_signature_value")
    }

    /// Rebuilds a signature from a SignatureInfo TLV and a SignatureValue
    /// TLV, e.g. the two final components of a signed Interest name.
    fn decode_signature_info_and_value(
        &self,
        _info: &[u8],
        _value: &[u8],
    ) -> Result<Signature, DecodeError> {
        unsupported_decode!(self, "decode_signature_info_and_value")
    }
}

static DEFAULT_WIRE_FORMAT: Lazy<RwLock<Arc<dyn WireFormat>>> =
    Lazy::new(|| RwLock::new(Arc::new(TlvWireFormat)));

/// The process-wide wire format used when none is passed explicitly.
/// Starts out as the TLV format.
pub fn default_wire_format() -> Arc<dyn WireFormat> {
    DEFAULT_WIRE_FORMAT
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replaces the process-wide default wire format.
pub fn set_default_wire_format(format: Arc<dyn WireFormat>) {
    *DEFAULT_WIRE_FORMAT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = format;
}

impl Interest {
    /// Encodes with the default wire format, reusing the cached encoding
    /// when the Interest has not changed since it was produced.
    pub fn wire_encode(&self) -> Result<SignedBlob, EncodeError> {
        default_wire_format().encode_interest(self)
    }

    /// Decodes with the default wire format.
    pub fn wire_decode(input: &[u8]) -> Result<Interest, DecodeError> {
        default_wire_format().decode_interest(input)
    }
}

impl Data {
    /// Encodes with the default wire format, reusing the cached encoding
    /// when the Data has not changed since it was produced.
    pub fn wire_encode(&self) -> Result<SignedBlob, EncodeError> {
        default_wire_format().encode_data(self)
    }

    /// Decodes with the default wire format.
    pub fn wire_decode(input: &[u8]) -> Result<Data, DecodeError> {
        default_wire_format().decode_data(input)
    }

    /// The name with the implicit SHA-256 digest of the wire encoding
    /// appended. Cached until the Data is mutated.
    pub fn full_name(&self) -> Result<Name, EncodeError> {
        let change_count = self.change_count();
        if let Some((cached_at, name)) = self.full_name_cache().borrow().as_ref() {
            if *cached_at == change_count {
                return Ok(name.clone());
            }
        }
        let wire = self.wire_encode()?;
        let digest: [u8; 32] = Sha256::digest(wire.as_ref()).into();
        let mut name = self.name().clone();
        name.append(Component::from_digest(Component::IMPLICIT_SHA256_DIGEST, digest));
        *self.full_name_cache().borrow_mut() = Some((change_count, name.clone()));
        Ok(name)
    }
}
