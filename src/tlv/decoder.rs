//! A cursor decoder over a TLV encoding.

use snafu::ensure;

use crate::error::DecodeError;
use crate::error::decode::{
    IncompleteSnafu, InvalidNonNegativeIntegerSnafu, LengthOutOfBoundsSnafu, TrailingBytesSnafu,
    UnexpectedTypeSnafu,
};
use crate::tlv::parser;

/// Decodes TLVs from a byte slice, tracking the absolute offset so callers
/// can record signed-portion boundaries.
#[derive(Debug)]
pub struct TlvDecoder<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> TlvDecoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    /// The absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> &'a [u8] {
        &self.input[self.offset..]
    }

    /// Reads a variable-length number.
    pub fn read_var_number(&mut self) -> Result<u64, DecodeError> {
        let (rest, value) = parser::var_number(self.remaining()).map_err(|_| {
            IncompleteSnafu.build()
        })?;
        self.offset = self.input.len() - rest.len();
        Ok(value)
    }

    /// Reads a TLV header, checking that the length fits in the input.
    pub fn read_type_and_length(&mut self) -> Result<(u64, usize), DecodeError> {
        let (rest, (ty, length)) = parser::type_and_length(self.remaining())
            .map_err(|_| IncompleteSnafu.build())?;
        self.offset = self.input.len() - rest.len();
        ensure!(
            length as usize <= rest.len(),
            LengthOutOfBoundsSnafu { length, available: rest.len() }
        );
        Ok((ty, length as usize))
    }

    /// Reads the header of an expected nested TLV and returns the offset
    /// just past its value, for use with [`TlvDecoder::finish_nested_tlvs`].
    pub fn read_nested_tlvs_start(&mut self, expected: u64) -> Result<usize, DecodeError> {
        let (ty, length) = self.read_type_and_length()?;
        ensure!(ty == expected, UnexpectedTypeSnafu { expected, found: ty });
        Ok(self.offset + length)
    }

    /// Checks that the nested value that started at
    /// [`TlvDecoder::read_nested_tlvs_start`] was consumed exactly.
    pub fn finish_nested_tlvs(&mut self, end_offset: usize) -> Result<(), DecodeError> {
        ensure!(
            self.offset == end_offset,
            TrailingBytesSnafu { count: end_offset.saturating_sub(self.offset) }
        );
        Ok(())
    }

    /// True if the next TLV (before `end_offset`) has the given type. Does
    /// not consume anything.
    pub fn peek_type(&self, expected: u64, end_offset: usize) -> bool {
        if self.offset >= end_offset {
            return false;
        }
        matches!(parser::var_number(self.remaining()), Ok((_, ty)) if ty == expected)
    }

    /// Reads one whole TLV of any type, returning the type and value.
    pub fn read_tlv(&mut self) -> Result<(u64, &'a [u8]), DecodeError> {
        let (ty, length) = self.read_type_and_length()?;
        let value = &self.remaining()[..length];
        self.offset += length;
        Ok((ty, value))
    }

    /// The raw input bytes in `[begin, end)`.
    pub fn bytes(&self, begin: usize, end: usize) -> &'a [u8] {
        &self.input[begin.min(self.input.len())..end.min(self.input.len())]
    }

    /// Moves the cursor forward to `offset`.
    pub fn skip_to(&mut self, offset: usize) {
        self.offset = offset.clamp(self.offset, self.input.len());
    }

    /// Reads a whole TLV of the expected type, returning its value.
    pub fn read_blob_tlv(&mut self, expected: u64) -> Result<&'a [u8], DecodeError> {
        let (ty, length) = self.read_type_and_length()?;
        ensure!(ty == expected, UnexpectedTypeSnafu { expected, found: ty });
        let value = &self.remaining()[..length];
        self.offset += length;
        Ok(value)
    }

    /// Reads a whole TLV of the expected type if it is next, before
    /// `end_offset`.
    pub fn read_optional_blob_tlv(
        &mut self,
        expected: u64,
        end_offset: usize,
    ) -> Result<Option<&'a [u8]>, DecodeError> {
        if self.peek_type(expected, end_offset) {
            Ok(Some(self.read_blob_tlv(expected)?))
        } else {
            Ok(None)
        }
    }

    /// Reads a non-negative integer TLV of the expected type.
    pub fn read_nonneg_integer_tlv(&mut self, expected: u64) -> Result<u64, DecodeError> {
        let value = self.read_blob_tlv(expected)?;
        decode_nonneg_integer(value)
    }

    /// Reads a non-negative integer TLV of the expected type if it is next,
    /// before `end_offset`.
    pub fn read_optional_nonneg_integer_tlv(
        &mut self,
        expected: u64,
        end_offset: usize,
    ) -> Result<Option<u64>, DecodeError> {
        if self.peek_type(expected, end_offset) {
            Ok(Some(self.read_nonneg_integer_tlv(expected)?))
        } else {
            Ok(None)
        }
    }

    /// Reads a zero-length presence TLV if it is next, before `end_offset`,
    /// returning whether it was present. A non-empty value is skipped, not
    /// rejected.
    pub fn read_boolean_tlv(
        &mut self,
        expected: u64,
        end_offset: usize,
    ) -> Result<bool, DecodeError> {
        if self.peek_type(expected, end_offset) {
            self.read_blob_tlv(expected)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Skips one whole TLV.
    pub fn skip_tlv(&mut self) -> Result<(), DecodeError> {
        let (_, length) = self.read_type_and_length()?;
        self.offset += length;
        Ok(())
    }

    /// Checks that the whole input was consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        ensure!(
            self.offset == self.input.len(),
            TrailingBytesSnafu { count: self.input.len() - self.offset }
        );
        Ok(())
    }
}

/// Decodes a 1/2/4/8-byte big-endian non-negative integer.
pub(crate) fn decode_nonneg_integer(value: &[u8]) -> Result<u64, DecodeError> {
    ensure!(
        matches!(value.len(), 1 | 2 | 4 | 8),
        InvalidNonNegativeIntegerSnafu { length: value.len() }
    );
    Ok(value.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_read() {
        // Name(7) holding two generic components.
        let wire = [7u8, 7, 8, 1, b'a', 8, 2, b'h', b'i'];
        let mut decoder = TlvDecoder::new(&wire);
        let end = decoder.read_nested_tlvs_start(7).unwrap();
        assert_eq!(9, end);
        assert_eq!(b"a", decoder.read_blob_tlv(8).unwrap());
        assert!(decoder.peek_type(8, end));
        assert_eq!(b"hi", decoder.read_blob_tlv(8).unwrap());
        assert!(!decoder.peek_type(8, end));
        decoder.finish_nested_tlvs(end).unwrap();
        decoder.finish().unwrap();
    }

    #[test]
    fn length_beyond_input_is_rejected() {
        let mut decoder = TlvDecoder::new(&[7, 10, 8, 1, b'a']);
        assert!(matches!(
            decoder.read_nested_tlvs_start(7),
            Err(DecodeError::LengthOutOfBounds { .. })
        ));
    }

    #[test]
    fn unexpected_type_is_reported() {
        let mut decoder = TlvDecoder::new(&[9, 0]);
        assert!(matches!(
            decoder.read_blob_tlv(7),
            Err(DecodeError::UnexpectedType { expected: 7, found: 9 })
        ));
    }

    #[test]
    fn nonneg_integer_widths() {
        assert_eq!(0xAB, decode_nonneg_integer(&[0xAB]).unwrap());
        assert_eq!(0x0102, decode_nonneg_integer(&[1, 2]).unwrap());
        assert_eq!(0x01020304, decode_nonneg_integer(&[1, 2, 3, 4]).unwrap());
        assert_eq!(
            0x0102030405060708,
            decode_nonneg_integer(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap()
        );
        assert!(decode_nonneg_integer(&[1, 2, 3]).is_err());
        assert!(decode_nonneg_integer(&[]).is_err());
    }
}
