//! Errors associated with producing TLV wire encodings.

use snafu::Snafu;

/// An error that occurred while encoding a packet.
///
/// Encode errors are raised synchronously, before any transport I/O is
/// attempted.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum EncodeError {
    /// The encoded packet is larger than the practical network-layer limit.
    #[snafu(display("encoded packet is {size} bytes, exceeding the {limit}-byte limit"))]
    SizeExceeded { size: usize, limit: usize },

    /// The selected wire format does not implement this operation. Only the
    /// TLV format is fully implemented; the legacy format is a stub kept for
    /// API compatibility.
    #[snafu(display("wire format {format:?} does not implement {operation}"))]
    UnsupportedFormat { format: &'static str, operation: &'static str },

    /// A field required by the encoding was not set.
    #[snafu(display("cannot encode without {field}"))]
    MissingField { field: &'static str },
}
