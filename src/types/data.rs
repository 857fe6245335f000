//! The Data packet: a named, signed payload.

use core::cell::RefCell;
use core::fmt;

use crate::types::{
    Blob, ChangeCounter, MetaInfo, Name, Signature, Snapshot, WireCache,
};

/// A named payload with meta info and a signature.
#[derive(Clone, Debug)]
pub struct Data {
    name: Name,
    meta_info: MetaInfo,
    content: Blob,
    signature: Signature,
    incoming_face_id: Option<u64>,
    congestion_mark: Option<u64>,
    change: ChangeCounter,
    name_snapshot: Snapshot,
    meta_info_snapshot: Snapshot,
    wire: WireCache,
    full_name: RefCell<Option<(u64, Name)>>,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            meta_info: MetaInfo::new(),
            content: Blob::default(),
            signature: Signature::default(),
            incoming_face_id: None,
            congestion_mark: None,
            change: ChangeCounter::default(),
            name_snapshot: Snapshot::default(),
            meta_info_snapshot: Snapshot::default(),
            wire: WireCache::default(),
            full_name: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn name_mut(&mut self) -> &mut Name {
        &mut self.name
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name = name;
        self.change.bump();
        self
    }

    pub fn meta_info(&self) -> &MetaInfo {
        &self.meta_info
    }

    pub fn meta_info_mut(&mut self) -> &mut MetaInfo {
        &mut self.meta_info
    }

    pub fn set_meta_info(&mut self, meta_info: MetaInfo) -> &mut Self {
        self.meta_info = meta_info;
        self.change.bump();
        self
    }

    pub fn content(&self) -> &Blob {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<Blob>) -> &mut Self {
        self.content = content.into();
        self.change.bump();
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signature_mut(&mut self) -> &mut Signature {
        self.change.bump();
        &mut self.signature
    }

    pub fn set_signature(&mut self, signature: Signature) -> &mut Self {
        self.signature = signature;
        self.change.bump();
        self
    }

    /// The face the local forwarder received this packet on, when it was
    /// delivered inside a link-protocol frame carrying that header.
    pub fn incoming_face_id(&self) -> Option<u64> {
        self.incoming_face_id
    }

    pub(crate) fn set_incoming_face_id(&mut self, face_id: Option<u64>) {
        self.incoming_face_id = face_id;
    }

    /// The congestion mark attached by the link protocol, if any.
    pub fn congestion_mark(&self) -> Option<u64> {
        self.congestion_mark
    }

    pub(crate) fn set_congestion_mark(&mut self, mark: Option<u64>) {
        self.congestion_mark = mark;
    }

    /// The aggregated change count, folding in mutations made directly to
    /// the name and meta info.
    pub(crate) fn change_count(&self) -> u64 {
        let mut changed = self.name_snapshot.check_changed(self.name.change_count());
        changed |= self
            .meta_info_snapshot
            .check_changed(self.meta_info.change_count());
        if changed {
            self.change.bump();
        }
        self.change.get()
    }

    pub(crate) fn wire_cache(&self) -> &WireCache {
        &self.wire
    }

    pub(crate) fn full_name_cache(&self) -> &RefCell<Option<(u64, Name)>> {
        &self.full_name
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.meta_info == other.meta_info
            && self.content == other.content
            && self.signature == other.signature
    }
}

impl Eq for Data {}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
