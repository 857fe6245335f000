//! The Link packet: a Data whose content is a delegation set.

use crate::types::{ContentType, Data, DelegationSet, Name};

/// A Data packet carrying a set of delegations that point toward the zones
/// where a producer's data can be fetched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Link {
    data: Data,
    delegations: DelegationSet,
}

impl Link {
    pub fn new(name: Name) -> Self {
        let mut data = Data::new(name);
        data.meta_info_mut().set_content_type(ContentType::Link);
        Self { data, delegations: DelegationSet::new() }
    }

    /// The underlying Data packet. Its content is refreshed from the
    /// delegation set when the Link is encoded.
    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    pub fn delegations(&self) -> &DelegationSet {
        &self.delegations
    }

    pub fn delegations_mut(&mut self) -> &mut DelegationSet {
        &mut self.delegations
    }

    /// Adds a delegation in preference order.
    pub fn add_delegation(&mut self, preference: i32, name: Name) -> &mut Self {
        self.delegations.add(preference, name);
        self
    }

    pub(crate) fn from_parts(data: Data, delegations: DelegationSet) -> Self {
        Self { data, delegations }
    }
}
