//! The registered-prefix table.

use tracing::debug;

use crate::types::Name;

pub(crate) struct RegisteredPrefix {
    pub(crate) id: u64,
    pub(crate) prefix: Name,
    pub(crate) related_interest_filter_id: Option<u64>,
}

/// Records each prefix registered with the forwarder, linked to the
/// interest-filter entry created alongside it (if any) so removal can
/// cascade. The same remove-request list as the pending-interest table
/// absorbs a removal racing the registration response.
#[derive(Default)]
pub(crate) struct RegisteredPrefixTable {
    table: Vec<RegisteredPrefix>,
    remove_requests: Vec<u64>,
}

impl RegisteredPrefixTable {
    /// Adds an entry, unless removal of `id` was already requested, in
    /// which case the request is consumed and nothing is added.
    pub(crate) fn add(
        &mut self,
        id: u64,
        prefix: Name,
        related_interest_filter_id: Option<u64>,
    ) -> bool {
        if let Some(at) = self.remove_requests.iter().position(|&r| r == id) {
            self.remove_requests.swap_remove(at);
            return false;
        }
        self.table
            .push(RegisteredPrefix { id, prefix, related_interest_filter_id });
        true
    }

    /// Removes the entry with `id`, returning the related interest-filter
    /// ids the caller must also remove. If no entry exists yet, records a
    /// remove request so a late insertion is cancelled.
    pub(crate) fn remove_registered_prefix(&mut self, id: u64) -> Vec<u64> {
        let mut related = Vec::new();
        let before = self.table.len();
        self.table.retain(|entry| {
            if entry.id == id {
                related.extend(entry.related_interest_filter_id);
                false
            } else {
                true
            }
        });
        if self.table.len() == before {
            debug!("remove_registered_prefix: no entry with id {id}");
            if !self.remove_requests.contains(&id) {
                self.remove_requests.push(id);
            }
        }
        related
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Name, u64)> {
        self.table.iter().map(|entry| (&entry.prefix, entry.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn removal_cascades_to_the_related_filter() {
        let mut table = RegisteredPrefixTable::default();
        assert!(table.add(1, name("/a"), Some(10)));
        assert!(table.add(2, name("/b"), None));
        assert_eq!(vec![10], table.remove_registered_prefix(1));
        assert!(table.remove_registered_prefix(2).is_empty());
        assert_eq!(0, table.len());
    }

    #[test]
    fn remove_before_insert_cancels_the_insert() {
        let mut table = RegisteredPrefixTable::default();
        table.remove_registered_prefix(5);
        assert!(!table.add(5, name("/a"), Some(11)));
        assert_eq!(0, table.len());
    }
}
