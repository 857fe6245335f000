//! The Exclude selector: a set of name components an Interest rules out.

use core::fmt;

use crate::types::{ChangeCounter, Component};

/// One entry of an [`Exclude`]: either a literal component or the "any"
/// wildcard spanning a range of components.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExcludeEntry {
    Any,
    Component(Component),
}

/// An alternating sequence of literal components and "any" wildcards.
///
/// A component is excluded if it equals a literal entry, or falls in the
/// range spanned by a wildcard: between the literals around the wildcard,
/// or unbounded where the wildcard leads or trails the sequence.
#[derive(Clone, Debug, Default)]
pub struct Exclude {
    entries: Vec<ExcludeEntry>,
    change: ChangeCounter,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExcludeEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ExcludeEntry] {
        &self.entries
    }

    /// Appends an "any" wildcard, returning `self` for chaining.
    pub fn append_any(&mut self) -> &mut Self {
        self.entries.push(ExcludeEntry::Any);
        self.change.bump();
        self
    }

    /// Appends a literal component, returning `self` for chaining.
    pub fn append_component(&mut self, component: Component) -> &mut Self {
        self.entries.push(ExcludeEntry::Component(component));
        self.change.bump();
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.change.bump();
    }

    /// True if `component` is ruled out by this exclude.
    pub fn matches(&self, component: &Component) -> bool {
        let mut i = 0;
        while i < self.entries.len() {
            match &self.entries[i] {
                ExcludeEntry::Component(literal) => {
                    if literal == component {
                        return true;
                    }
                    i += 1;
                }
                ExcludeEntry::Any => {
                    // The wildcard spans from the literal before it (if any)
                    // to the literal after it (if any), inclusive.
                    let lower = match i.checked_sub(1).map(|p| &self.entries[p]) {
                        Some(ExcludeEntry::Component(literal)) => Some(literal),
                        _ => None,
                    };
                    let upper = match self.entries.get(i + 1) {
                        Some(ExcludeEntry::Component(literal)) => Some(literal),
                        _ => None,
                    };
                    let above = lower.map_or(true, |l| l.compare(component).is_le());
                    let below = upper.map_or(true, |u| component.compare(u).is_le());
                    if above && below {
                        return true;
                    }
                    i += 1;
                }
            }
        }
        false
    }

    pub(crate) fn change_count(&self) -> u64 {
        self.change.get()
    }
}

impl PartialEq for Exclude {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Exclude {}

impl fmt::Display for Exclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            match entry {
                ExcludeEntry::Any => f.write_str("*")?,
                ExcludeEntry::Component(component) => write!(f, "{component}")?,
            }
        }
        Ok(())
    }
}
