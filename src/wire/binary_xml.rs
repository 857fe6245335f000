//! The legacy binary-XML wire format, kept as a stub.

use crate::wire::WireFormat;

/// The pre-TLV wire format. Every operation fails as unsupported; the type
/// exists so code written against the old API keeps compiling.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryXmlWireFormat;

impl WireFormat for BinaryXmlWireFormat {
    fn name(&self) -> &'static str {
        "binary-xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeError;
    use crate::types::Name;

    #[test]
    fn every_operation_is_unsupported() {
        let format = BinaryXmlWireFormat;
        let result = format.encode_name(&Name::from_uri("/a").unwrap());
        assert!(matches!(result, Err(EncodeError::UnsupportedFormat { .. })));
        assert!(format.decode_interest(&[5, 0]).is_err());
    }
}
