//! # NDN Data Types
//!
//! The `types` module is a collection of Rust types and data structures
//! representing the NDN packet model: names and their components, the
//! Interest and Data packets, and the subobjects they carry.

mod blob;
mod change;
mod control;
mod data;
mod delegation_set;
mod exclude;
mod interest;
mod key_locator;
mod link;
mod lp;
mod meta_info;
mod name;
mod signature;

pub use self::{
    blob::{Blob, SignedBlob},
    control::{ControlParameters, ControlResponse, ForwardingFlags},
    data::Data,
    delegation_set::{Delegation, DelegationSet},
    exclude::{Exclude, ExcludeEntry},
    interest::Interest,
    key_locator::KeyLocator,
    link::Link,
    lp::{LpPacket, NackReason, NetworkNack},
    meta_info::{ContentType, MetaInfo},
    name::{Component, Name},
    signature::{GenericSignature, Signature, SignatureParams, ValidityPeriod},
};

pub(crate) use self::change::{ChangeCounter, Snapshot, WireCache};

/// A duration in milliseconds.
pub type Milliseconds = u64;

/// An absolute time in milliseconds since the UNIX epoch.
pub type MillisecondsSince1970 = u64;
