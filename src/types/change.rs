//! Change counting for cached wire encodings.
//!
//! Every mutable packet container carries a [`ChangeCounter`] that is bumped
//! on mutation. Composites snapshot each child's counter with a [`Snapshot`];
//! aggregating the snapshots lets a parent notice a deep mutation and discard
//! its cached encoding without holding back-pointers into children.

use core::cell::{Cell, RefCell};

use crate::types::SignedBlob;

/// A monotonically increasing mutation counter.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChangeCounter {
    count: Cell<u64>,
}

impl ChangeCounter {
    pub(crate) fn bump(&self) {
        self.count.set(self.count.get().wrapping_add(1));
    }

    pub(crate) fn get(&self) -> u64 {
        self.count.get()
    }
}

/// The last observed value of a child's [`ChangeCounter`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Snapshot {
    seen: Cell<u64>,
}

impl Snapshot {
    /// Returns true if `current` differs from the snapshot, refreshing the
    /// snapshot in that case.
    pub(crate) fn check_changed(&self, current: u64) -> bool {
        if self.seen.get() != current {
            self.seen.set(current);
            true
        } else {
            false
        }
    }
}

/// A cached wire encoding, keyed by the wire format that produced it and
/// the owning packet's change count at encode time.
///
/// The cache is silently discarded when the key no longer matches, so a
/// mutated packet never serves a stale encoding.
#[derive(Clone, Debug, Default)]
pub(crate) struct WireCache {
    cached: RefCell<Option<CachedWire>>,
}

#[derive(Clone, Debug)]
struct CachedWire {
    format: &'static str,
    change_count: u64,
    wire: SignedBlob,
}

impl WireCache {
    pub(crate) fn get(&self, format: &'static str, change_count: u64) -> Option<SignedBlob> {
        self.cached
            .borrow()
            .as_ref()
            .filter(|cached| cached.format == format && cached.change_count == change_count)
            .map(|cached| cached.wire.clone())
    }

    pub(crate) fn set(&self, format: &'static str, change_count: u64, wire: SignedBlob) {
        *self.cached.borrow_mut() = Some(CachedWire { format, change_count, wire });
    }
}
