//! Back-to-front TLV encoding.

use crate::types::Blob;

/// A TLV encoder that fills its buffer from the back.
///
/// Nested values are emitted before their headers, so each length is known
/// by the time its header is written and no second pass is needed. Offsets
/// into the final encoding are recovered from [`TlvEncoder::len`] marks:
/// a byte written when `len()` was `n` ends up `n` bytes from the end.
#[derive(Debug)]
pub struct TlvEncoder {
    buffer: Vec<u8>,
    position: usize,
}

impl Default for TlvEncoder {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl TlvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: vec![0; capacity.max(16)], position: capacity.max(16) }
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(&mut self, needed: usize) {
        if self.position >= needed {
            return;
        }
        let used = self.len();
        let grown = (self.buffer.len() * 2).max(used + needed + 16);
        let mut buffer = vec![0; grown];
        buffer[grown - used..].copy_from_slice(&self.buffer[self.position..]);
        self.position = grown - used;
        self.buffer = buffer;
    }

    pub fn prepend_byte(&mut self, byte: u8) {
        self.make_room(1);
        self.position -= 1;
        self.buffer[self.position] = byte;
    }

    pub fn prepend_bytes(&mut self, bytes: &[u8]) {
        self.make_room(bytes.len());
        self.position -= bytes.len();
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
    }

    /// Prepends a variable-length number.
    pub fn prepend_var_number(&mut self, value: u64) {
        if value < 253 {
            self.prepend_byte(value as u8);
        } else if value <= 0xffff {
            self.prepend_bytes(&(value as u16).to_be_bytes());
            self.prepend_byte(0xFD);
        } else if value <= 0xffff_ffff {
            self.prepend_bytes(&(value as u32).to_be_bytes());
            self.prepend_byte(0xFE);
        } else {
            self.prepend_bytes(&value.to_be_bytes());
            self.prepend_byte(0xFF);
        }
    }

    /// Prepends a TLV header for a value of `length` bytes that has already
    /// been prepended.
    pub fn prepend_type_and_length(&mut self, ty: u64, length: usize) {
        self.prepend_var_number(length as u64);
        self.prepend_var_number(ty);
    }

    /// Prepends a non-negative integer on 1, 2, 4 or 8 bytes.
    pub fn prepend_nonneg_integer(&mut self, value: u64) {
        if value <= 0xff {
            self.prepend_byte(value as u8);
        } else if value <= 0xffff {
            self.prepend_bytes(&(value as u16).to_be_bytes());
        } else if value <= 0xffff_ffff {
            self.prepend_bytes(&(value as u32).to_be_bytes());
        } else {
            self.prepend_bytes(&value.to_be_bytes());
        }
    }

    /// Prepends a whole TLV holding `value`.
    pub fn prepend_blob_tlv(&mut self, ty: u64, value: &[u8]) {
        self.prepend_bytes(value);
        self.prepend_type_and_length(ty, value.len());
    }

    /// Prepends a whole TLV holding a non-negative integer.
    pub fn prepend_nonneg_integer_tlv(&mut self, ty: u64, value: u64) {
        let start = self.len();
        self.prepend_nonneg_integer(value);
        let length = self.len() - start;
        self.prepend_type_and_length(ty, length);
    }

    /// The finished encoding.
    pub fn finish(self) -> Blob {
        Blob::new(bytes::Bytes::from(self.buffer).slice(self.position..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_tlvs_back_to_front() {
        let mut encoder = TlvEncoder::with_capacity(4);
        encoder.prepend_blob_tlv(8, b"hi");
        encoder.prepend_blob_tlv(8, b"a");
        let inner = encoder.len();
        encoder.prepend_type_and_length(7, inner);
        assert_eq!(&[7, 7, 8, 1, b'a', 8, 2, b'h', b'i'], encoder.finish().as_ref());
    }

    #[test]
    fn var_number_boundaries() {
        for (value, expected) in [
            (252u64, vec![252u8]),
            (253, vec![0xFD, 0x00, 0xFD]),
            (0xffff, vec![0xFD, 0xFF, 0xFF]),
            (0x1_0000, vec![0xFE, 0, 1, 0, 0]),
            (0x1_0000_0000, vec![0xFF, 0, 0, 0, 1, 0, 0, 0, 0]),
        ] {
            let mut encoder = TlvEncoder::new();
            encoder.prepend_var_number(value);
            assert_eq!(expected, encoder.finish().to_vec());
        }
    }

    #[test]
    fn nonneg_integer_minimal_widths() {
        for (value, width) in [(0u64, 1usize), (0xff, 1), (0x100, 2), (0x1_0000, 4), (0x1_0000_0000, 8)] {
            let mut encoder = TlvEncoder::new();
            encoder.prepend_nonneg_integer(value);
            assert_eq!(width, encoder.len());
        }
    }

    #[test]
    fn growth_preserves_written_bytes() {
        let mut encoder = TlvEncoder::with_capacity(2);
        for byte in (0u8..100).rev() {
            encoder.prepend_byte(byte);
        }
        let out = encoder.finish();
        assert_eq!((0u8..100).collect::<Vec<_>>(), out.to_vec());
    }
}
