//! Interest filters and the interest-filter table.

use tracing::debug;

use crate::error::InvalidArgument;
use crate::security::regex::NdnRegexTopMatcher;
use crate::types::{Interest, Name};

/// The callback invoked for an Interest matching a registered filter, with
/// the filter's prefix, the Interest, the filter entry id, and the filter.
pub type OnInterest = Box<dyn FnMut(&Name, &Interest, u64, &InterestFilter)>;

/// Selects Interests by prefix, optionally narrowed by an NDN name regex.
#[derive(Clone, Debug)]
pub struct InterestFilter {
    prefix: Name,
    regex: Option<NdnRegexTopMatcher>,
}

impl InterestFilter {
    /// A filter matching every Interest under `prefix`.
    pub fn new(prefix: Name) -> Self {
        Self { prefix, regex: None }
    }

    /// A filter matching Interests under `prefix` whose name also matches
    /// the NDN name regex `pattern`, e.g. `<b><c>*`.
    pub fn with_regex(prefix: Name, pattern: &str) -> Result<Self, InvalidArgument> {
        Ok(Self { prefix, regex: Some(NdnRegexTopMatcher::new(pattern)?) })
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    pub fn regex_pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(NdnRegexTopMatcher::pattern)
    }

    /// True if `name` starts with the prefix and, when a regex is present,
    /// the components after the prefix match it too.
    pub fn matches(&self, name: &Name) -> bool {
        if !self.prefix.is_prefix_of(name) {
            return false;
        }
        match &self.regex {
            Some(regex) => regex.matches(&name.get_sub_name(self.prefix.len() as isize, None)),
            None => true,
        }
    }
}

impl From<Name> for InterestFilter {
    fn from(prefix: Name) -> Self {
        Self::new(prefix)
    }
}

pub(crate) struct FilterEntry {
    pub(crate) id: u64,
    pub(crate) filter: InterestFilter,
    pub(crate) on_interest: OnInterest,
}

/// Holds the locally registered Interest callbacks.
#[derive(Default)]
pub(crate) struct InterestFilterTable {
    table: Vec<FilterEntry>,
}

impl InterestFilterTable {
    pub(crate) fn set_interest_filter(&mut self, id: u64, filter: InterestFilter, on_interest: OnInterest) {
        self.table.push(FilterEntry { id, filter, on_interest });
    }

    /// The `(id, filter)` of every entry matching `name`, in insertion
    /// order.
    pub(crate) fn matched_filters(&self, name: &Name) -> Vec<(u64, InterestFilter)> {
        self.table
            .iter()
            .filter(|entry| entry.filter.matches(name))
            .map(|entry| (entry.id, entry.filter.clone()))
            .collect()
    }

    pub(crate) fn entry_mut(&mut self, id: u64) -> Option<&mut FilterEntry> {
        self.table.iter_mut().find(|entry| entry.id == id)
    }

    pub(crate) fn unset_interest_filter(&mut self, id: u64) {
        let before = self.table.len();
        self.table.retain(|entry| entry.id != id);
        if self.table.len() == before {
            debug!("unset_interest_filter: no entry with id {id}");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn prefix_only_filter() {
        let filter = InterestFilter::new(name("/a/b"));
        assert!(filter.matches(&name("/a/b")));
        assert!(filter.matches(&name("/a/b/c")));
        assert!(!filter.matches(&name("/a/c")));
    }

    #[test]
    fn regex_narrows_the_prefix() {
        let filter = InterestFilter::with_regex(name("/hello"), "<world><>+").unwrap();
        assert!(filter.matches(&name("/hello/world/x")));
        assert!(!filter.matches(&name("/hello/world")));
        assert!(!filter.matches(&name("/hello/there/x")));
    }

    #[test]
    fn table_matches_in_insertion_order() {
        let mut table = InterestFilterTable::default();
        table.set_interest_filter(1, InterestFilter::new(name("/a")), Box::new(|_, _, _, _| {}));
        table.set_interest_filter(2, InterestFilter::new(name("/a/b")), Box::new(|_, _, _, _| {}));
        table.set_interest_filter(3, InterestFilter::new(name("/c")), Box::new(|_, _, _, _| {}));
        let ids: Vec<u64> = table
            .matched_filters(&name("/a/b/c"))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(vec![1, 2], ids);
        table.unset_interest_filter(1);
        assert_eq!(2, table.len());
    }
}
