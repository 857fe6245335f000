//! Errors associated with decoding TLV wire encodings.

use snafu::Snafu;

/// An error that occurred while decoding a TLV wire encoding.
///
/// Decode errors propagate synchronously to the caller of a `decode_*`
/// method. The node's event loop instead logs them and discards the frame,
/// so a malformed packet cannot take the loop down.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum DecodeError {
    /// The input ended before a complete TLV could be read.
    #[snafu(display("input ended before a complete TLV could be read"))]
    Incomplete,

    /// A different TLV type was found than the one required here.
    #[snafu(display("expected TLV type {expected}, found {found}"))]
    UnexpectedType { expected: u64, found: u64 },

    /// A TLV length field pointed past the end of its enclosing value.
    #[snafu(display("TLV length {length} exceeds the {available} available bytes"))]
    LengthOutOfBounds { length: u64, available: usize },

    /// A non-negative integer had a value length other than 1, 2, 4 or 8.
    #[snafu(display("invalid non-negative integer length {length}"))]
    InvalidNonNegativeInteger { length: usize },

    /// Bytes remained after the outermost TLV was fully decoded.
    #[snafu(display("{count} trailing bytes after the outer TLV"))]
    TrailingBytes { count: usize },

    /// A digest name component did not hold exactly 32 bytes.
    #[snafu(display("digest component has {length} bytes; expected 32"))]
    InvalidDigestComponent { length: usize },

    /// A required nested TLV was missing from its parent.
    #[snafu(display("missing required {field} TLV"))]
    MissingField { field: &'static str },

    /// A value that must be UTF-8 text was not.
    #[snafu(display("{field} is not valid UTF-8"))]
    InvalidText { field: &'static str },

    /// A field held a value outside its legal range.
    #[snafu(display("{field} value is out of range"))]
    ValueOutOfRange { field: &'static str },

    /// A decoded packet failed a structural requirement, e.g. a certificate
    /// name not following the `/<identity>/KEY/<key-id>/<issuer>/<version>`
    /// convention.
    #[snafu(display("malformed {what}: {reason}"))]
    Malformed { what: &'static str, reason: String },

    /// An unrecognized TLV outside the link protocol's ignorable header
    /// range.
    #[snafu(display("unrecognized critical TLV type {ty}"))]
    UnknownCriticalField { ty: u64 },

    /// The selected wire format does not implement this operation.
    #[snafu(display("wire format {format:?} does not implement {operation}"))]
    UnsupportedFormat { format: &'static str, operation: &'static str },
}
