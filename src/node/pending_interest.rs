//! The pending-interest table.

use tracing::{debug, warn};

use crate::node::{OnData, OnNetworkNack, OnRegisterFailed, OnRegisterSuccess, OnTimeout};
use crate::node::interest_filter::OnInterest;
use crate::types::{Data, Interest, Name};

/// What to do when a pending Interest resolves.
pub(crate) enum PendingKind {
    /// An application Interest with its user callbacks.
    User {
        on_data: Option<OnData>,
        on_timeout: Option<OnTimeout>,
        on_network_nack: Option<OnNetworkNack>,
    },
    /// A prefix-registration command awaiting its ControlResponse.
    Register(Box<RegisterInfo>),
}

impl PendingKind {
    fn has_network_nack(&self) -> bool {
        matches!(self, PendingKind::User { on_network_nack: Some(_), .. })
    }
}

/// The state carried by an in-flight prefix registration until the
/// forwarder answers.
pub(crate) struct RegisterInfo {
    pub(crate) prefix: Name,
    pub(crate) registered_prefix_id: u64,
    pub(crate) on_interest: Option<OnInterest>,
    pub(crate) on_register_failed: OnRegisterFailed,
    pub(crate) on_register_success: Option<OnRegisterSuccess>,
}

/// One entry: the Interest as sent (nonce stamped) plus its resolution.
pub(crate) struct PendingInterest {
    pub(crate) id: u64,
    pub(crate) interest: Interest,
    pub(crate) kind: PendingKind,
}

/// Holds the Interests awaiting a matching Data, a Nack, or a timeout.
///
/// Entries are extracted (removed) at dispatch time, so each resolves at
/// most once; a timeout that fires after extraction finds nothing and is a
/// no-op. A remove-request list absorbs the race where a removal arrives
/// before the entry is inserted.
#[derive(Default)]
pub(crate) struct PendingInterestTable {
    table: Vec<PendingInterest>,
    remove_requests: Vec<u64>,
}

impl PendingInterestTable {
    /// Adds an entry, unless removal of `id` was already requested, in
    /// which case the request is consumed and nothing is added.
    pub(crate) fn add(&mut self, id: u64, interest: Interest, kind: PendingKind) -> bool {
        if let Some(at) = self.remove_requests.iter().position(|&r| r == id) {
            self.remove_requests.swap_remove(at);
            return false;
        }
        self.table.push(PendingInterest { id, interest, kind });
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    /// Removes and returns, in insertion order, every entry whose Interest
    /// is satisfied by `data`.
    pub(crate) fn extract_entries_for_data(&mut self, data: &Data) -> Vec<PendingInterest> {
        let mut extracted = Vec::new();
        let mut index = 0;
        while index < self.table.len() {
            let matches = match self.table[index].interest.matches_data(data) {
                Ok(matches) => matches,
                Err(error) => {
                    warn!("failed to match pending interest against data: {error}");
                    false
                }
            };
            if matches {
                extracted.push(self.table.remove(index));
            } else {
                index += 1;
            }
        }
        extracted
    }

    /// Removes and returns every entry that has a Nack callback and whose
    /// sent wire encoding equals `wire`. Entries without a Nack callback
    /// stay so their timeout can fire later.
    pub(crate) fn extract_entries_for_nack(&mut self, wire: &[u8]) -> Vec<PendingInterest> {
        let mut extracted = Vec::new();
        let mut index = 0;
        while index < self.table.len() {
            let entry = &self.table[index];
            let matches = entry.kind.has_network_nack()
                && match entry.interest.wire_encode() {
                    Ok(encoding) => encoding.as_ref() == wire,
                    Err(error) => {
                        warn!("failed to encode pending interest for nack match: {error}");
                        false
                    }
                };
            if matches {
                extracted.push(self.table.remove(index));
            } else {
                index += 1;
            }
        }
        extracted
    }

    /// Removes and returns the entry with `id`, for timeout processing.
    pub(crate) fn extract_entry(&mut self, id: u64) -> Option<PendingInterest> {
        let at = self.table.iter().position(|entry| entry.id == id)?;
        Some(self.table.remove(at))
    }

    /// Removes the entry with `id`. If no entry exists yet, records a
    /// remove request so a late insertion is cancelled; removal is
    /// idempotent either way.
    pub(crate) fn remove_pending_interest(&mut self, id: u64) {
        let before = self.table.len();
        self.table.retain(|entry| entry.id != id);
        if self.table.len() == before {
            debug!("remove_pending_interest: no entry with id {id}");
            if !self.remove_requests.contains(&id) {
                self.remove_requests.push(id);
            }
        }
    }
}
