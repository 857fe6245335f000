//! Delegation sets, used for forwarding hints and Link payloads.

use crate::types::{ChangeCounter, Name};

/// One delegation: a preference and the name of a zone that can reach the
/// producer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delegation {
    preference: i32,
    name: Name,
}

impl Delegation {
    pub fn new(preference: i32, name: Name) -> Self {
        Self { preference, name }
    }

    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn name(&self) -> &Name {
        &self.name
    }
}

/// An ordered list of delegations.
///
/// [`DelegationSet::add`] keeps the list sorted by preference then name and
/// drops an existing delegation with the same name. A set decoded from the
/// wire instead preserves the order and duplicates as received.
#[derive(Clone, Debug, Default)]
pub struct DelegationSet {
    delegations: Vec<Delegation>,
    change: ChangeCounter,
}

impl DelegationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.delegations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Delegation> {
        self.delegations.get(index)
    }

    pub fn delegations(&self) -> &[Delegation] {
        &self.delegations
    }

    /// Adds a delegation in sorted position, replacing any existing
    /// delegation with the same name.
    pub fn add(&mut self, preference: i32, name: Name) {
        self.remove(&name);
        let delegation = Delegation::new(preference, name);
        let at = self
            .delegations
            .partition_point(|d| {
                (d.preference, &d.name) <= (delegation.preference, &delegation.name)
            });
        self.delegations.insert(at, delegation);
        self.change.bump();
    }

    /// Appends a delegation as-is. Used when decoding, where received order
    /// and duplicates must be preserved.
    pub fn add_unsorted(&mut self, preference: i32, name: Name) {
        self.delegations.push(Delegation::new(preference, name));
        self.change.bump();
    }

    /// Removes every delegation with `name`, reporting whether any was
    /// found.
    pub fn remove(&mut self, name: &Name) -> bool {
        let before = self.delegations.len();
        self.delegations.retain(|d| d.name != *name);
        if self.delegations.len() != before {
            self.change.bump();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.delegations.clear();
        self.change.bump();
    }

    /// The index of the first delegation with `name`.
    pub fn find(&self, name: &Name) -> Option<usize> {
        self.delegations.iter().position(|d| d.name == *name)
    }

    pub(crate) fn change_count(&self) -> u64 {
        self.change.get()
    }
}

impl PartialEq for DelegationSet {
    fn eq(&self, other: &Self) -> bool {
        self.delegations == other.delegations
    }
}

impl Eq for DelegationSet {}
