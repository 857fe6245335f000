//! Immutable byte buffers with shared ownership.

use core::fmt;
use core::ops;

use bytes::Bytes;

/// An immutable byte buffer with cheap clones.
///
/// `Blob` wraps [`bytes::Bytes`], so cloning a blob or slicing one out of a
/// larger encoding shares the underlying storage instead of copying it.
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Blob(Bytes);

impl Blob {
    /// Creates a new blob taking ownership of `bytes`.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Creates a new blob copying from `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A shared sub-slice of this blob over `range`, without copying.
    pub fn slice(&self, range: ops::Range<usize>) -> Blob {
        Self(self.0.slice(range))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl ops::Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl<const N: usize> From<[u8; N]> for Blob {
    fn from(bytes: [u8; N]) -> Self {
        Self(Bytes::copy_from_slice(&bytes))
    }
}

impl From<Bytes> for Blob {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({})", hex::encode(&self.0))
    }
}

/// A wire encoding together with the byte range covered by its signature.
///
/// The signed range lets signature verification and implicit-digest
/// computation operate on the already produced encoding without
/// re-encoding the packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignedBlob {
    blob: Blob,
    signed_begin: usize,
    signed_end: usize,
}

impl SignedBlob {
    /// Creates a new signed blob whose signed range is `[begin, end)`.
    pub fn new(blob: impl Into<Blob>, signed_begin: usize, signed_end: usize) -> Self {
        Self { blob: blob.into(), signed_begin, signed_end }
    }

    /// The whole encoding.
    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    /// The offset where the signed range begins.
    pub fn signed_begin(&self) -> usize {
        self.signed_begin
    }

    /// The offset just past the signed range.
    pub fn signed_end(&self) -> usize {
        self.signed_end
    }

    /// The bytes covered by the signature.
    pub fn signed_portion(&self) -> &[u8] {
        &self.blob[self.signed_begin..self.signed_end]
    }

    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

impl ops::Deref for SignedBlob {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.blob
    }
}

impl AsRef<[u8]> for SignedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.blob
    }
}
