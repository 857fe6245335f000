//! # The dispatch engine
//!
//! [`Node`] connects the packet model to a [`Transport`]: it expresses
//! Interests, registers prefixes with the local forwarder, and dispatches
//! inbound packets to the pending-interest and interest-filter tables. All
//! table mutation and callback invocation happen on the thread driving
//! [`Node::process_events`]; [`ThreadsafeNode`] serializes foreign-thread
//! operations onto that thread.

pub(crate) mod delayed_call;
mod interest_filter;
mod pending_interest;
mod registered_prefix;
mod threadsafe;

pub use interest_filter::{InterestFilter, OnInterest};
pub use threadsafe::{NodeHandle, ThreadsafeNode};

use std::sync::atomic::{AtomicU64, Ordering};

use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::error::EncodeError;
use crate::node::delayed_call::DelayedCallTable;
use crate::node::pending_interest::{PendingInterestTable, PendingKind, RegisterInfo};
use crate::node::registered_prefix::RegisteredPrefixTable;
use crate::security::{CommandInterestSigner, KeyChain, KeyChainError};
use crate::tlv;
use crate::transport::Transport;
use crate::types::{
    Component, ControlParameters, Data, ForwardingFlags, Interest, Milliseconds, Name,
    NetworkNack,
};
use crate::wire::default_wire_format;

use self::interest_filter::InterestFilterTable;

/// The practical limit of a network-layer packet. Larger packets fail
/// synchronously before any transport I/O.
pub const MAX_NDN_PACKET_SIZE: usize = 8800;

/// Called when a Data satisfying the expressed Interest arrives.
pub type OnData = Box<dyn FnOnce(&Interest, &Data)>;
/// Called when the expressed Interest's lifetime elapses unanswered.
pub type OnTimeout = Box<dyn FnOnce(&Interest)>;
/// Called when the network refuses the expressed Interest.
pub type OnNetworkNack = Box<dyn FnOnce(&Interest, &NetworkNack)>;
/// Called when prefix registration fails, with the prefix.
pub type OnRegisterFailed = Box<dyn FnOnce(&Name)>;
/// Called when the forwarder accepts a prefix registration, with the
/// prefix and the registration's entry id.
pub type OnRegisterSuccess = Box<dyn FnOnce(&Name, u64)>;

static LAST_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// The next process-unique table-entry id. Atomic so an id can be handed
/// out on a foreign thread before the operation is dispatched to the event
/// thread.
pub fn next_entry_id() -> u64 {
    LAST_ENTRY_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// An error from a node operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum NodeError {
    /// The packet could not be encoded, including the over-size case.
    #[snafu(display("failed to encode packet: {source}"))]
    Encode { source: EncodeError },

    /// The transport reported an I/O failure.
    #[snafu(display("transport error: {source}"))]
    Transport { source: std::io::Error },

    /// Signing the prefix-registration command failed.
    #[snafu(display("failed to sign command interest: {source}"))]
    Sign { source: KeyChainError },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ConnectStatus {
    Unconnected,
    ConnectRequested,
    ConnectComplete,
}

/// The dispatch engine over one transport connection.
pub struct Node {
    transport: Box<dyn Transport>,
    pit: PendingInterestTable,
    ift: InterestFilterTable,
    rpt: RegisteredPrefixTable,
    dct: DelayedCallTable,
    command_signer: CommandInterestSigner,
    connect_status: ConnectStatus,
}

impl Node {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            pit: PendingInterestTable::default(),
            ift: InterestFilterTable::default(),
            rpt: RegisteredPrefixTable::default(),
            dct: DelayedCallTable::default(),
            command_signer: CommandInterestSigner::new(),
            connect_status: ConnectStatus::Unconnected,
        }
    }

    /// Sends `interest` and resolves it through the returned entry id:
    /// `on_data` for a matching Data, `on_timeout` when the lifetime
    /// elapses, `on_network_nack` for a network refusal. At most one of the
    /// three fires. A fresh random nonce is stamped on the sent copy.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: OnData,
        on_timeout: Option<OnTimeout>,
        on_network_nack: Option<OnNetworkNack>,
    ) -> Result<u64, NodeError> {
        let id = next_entry_id();
        self.express_interest_entry(
            id,
            interest,
            PendingKind::User { on_data: Some(on_data), on_timeout, on_network_nack },
        )?;
        Ok(id)
    }

    pub(crate) fn express_interest_entry(
        &mut self,
        id: u64,
        mut interest: Interest,
        kind: PendingKind,
    ) -> Result<(), NodeError> {
        self.connect_if_needed()?;
        interest.set_nonce(rand::random::<[u8; 4]>().to_vec());
        let wire = interest.wire_encode().context(EncodeSnafu)?;
        if wire.len() > MAX_NDN_PACKET_SIZE {
            return Err(NodeError::Encode {
                source: EncodeError::SizeExceeded { size: wire.len(), limit: MAX_NDN_PACKET_SIZE },
            });
        }
        let lifetime = interest.interest_lifetime();
        if !self.pit.add(id, interest, kind) {
            // Removal was requested before we got here; send nothing.
            return Ok(());
        }
        if let Some(lifetime) = lifetime {
            self.dct
                .call_later(lifetime, Box::new(move |node| node.process_interest_timeout(id)));
        }
        self.transport.send(wire.as_ref()).context(TransportSnafu)
    }

    /// Cancels the pending Interest with `id`. Idempotent, and effective
    /// even when it races ahead of the table insertion.
    pub fn remove_pending_interest(&mut self, id: u64) {
        self.pit.remove_pending_interest(id);
    }

    /// Turns `interest` into a signed command Interest using this node's
    /// timestamp state, so consecutive commands carry strictly increasing
    /// timestamps.
    pub fn make_command_interest(
        &mut self,
        interest: &mut Interest,
        key_chain: &mut KeyChain,
        certificate_name: &Name,
    ) -> Result<(), NodeError> {
        self.command_signer
            .sign(interest, key_chain, certificate_name)
            .context(SignSnafu)
    }

    /// Registers `prefix` with the connected forwarder via a signed
    /// `/localhost/nfd/rib/register` command. On a status-200 response the
    /// optional `on_interest` is installed as an interest filter and
    /// `on_register_success` fires; any other status or a timeout invokes
    /// `on_register_failed`.
    #[allow(clippy::too_many_arguments)]
    pub fn register_prefix(
        &mut self,
        prefix: Name,
        on_interest: Option<OnInterest>,
        on_register_failed: OnRegisterFailed,
        on_register_success: Option<OnRegisterSuccess>,
        flags: ForwardingFlags,
        key_chain: &mut KeyChain,
        certificate_name: &Name,
    ) -> Result<u64, NodeError> {
        let registered_prefix_id = next_entry_id();
        let format = default_wire_format();

        let mut parameters = ControlParameters::new();
        parameters.set_name(prefix.clone());
        parameters.set_forwarding_flags(flags);
        let encoded_parameters =
            format.encode_control_parameters(&parameters).context(EncodeSnafu)?;

        let mut command_name = Name::new();
        command_name
            .append_str("localhost")
            .append_str("nfd")
            .append_str("rib")
            .append_str("register")
            .append(Component::new(encoded_parameters.to_vec()));
        let mut command = Interest::new(command_name);
        self.command_signer
            .sign(&mut command, key_chain, certificate_name)
            .context(SignSnafu)?;

        let info = RegisterInfo {
            prefix,
            registered_prefix_id,
            on_interest,
            on_register_failed,
            on_register_success,
        };
        let id = next_entry_id();
        self.express_interest_entry(id, command, PendingKind::Register(Box::new(info)))?;
        Ok(registered_prefix_id)
    }

    /// Removes the registered-prefix entry with `id`, cascading to the
    /// interest filter created by the registration, if any.
    pub fn remove_registered_prefix(&mut self, id: u64) {
        for filter_id in self.rpt.remove_registered_prefix(id) {
            self.ift.unset_interest_filter(filter_id);
        }
    }

    /// Adds a local interest filter without contacting the forwarder.
    pub fn set_interest_filter(
        &mut self,
        filter: impl Into<InterestFilter>,
        on_interest: OnInterest,
    ) -> u64 {
        let id = next_entry_id();
        self.ift.set_interest_filter(id, filter.into(), on_interest);
        id
    }

    pub(crate) fn set_interest_filter_with_id(
        &mut self,
        id: u64,
        filter: InterestFilter,
        on_interest: OnInterest,
    ) {
        self.ift.set_interest_filter(id, filter, on_interest);
    }

    /// Removes the interest filter with `id`.
    pub fn unset_interest_filter(&mut self, id: u64) {
        self.ift.unset_interest_filter(id);
    }

    /// Encodes and sends a Data packet, e.g. in response to a dispatched
    /// Interest.
    pub fn put_data(&mut self, data: &Data) -> Result<(), NodeError> {
        self.connect_if_needed()?;
        let wire = data.wire_encode().context(EncodeSnafu)?;
        self.send(wire.as_ref())
    }

    /// Sends an already encoded packet, enforcing the size limit.
    pub fn send(&mut self, wire: &[u8]) -> Result<(), NodeError> {
        if wire.len() > MAX_NDN_PACKET_SIZE {
            return Err(NodeError::Encode {
                source: EncodeError::SizeExceeded { size: wire.len(), limit: MAX_NDN_PACKET_SIZE },
            });
        }
        self.connect_if_needed()?;
        self.transport.send(wire).context(TransportSnafu)
    }

    /// Polls the transport for inbound elements, dispatches them, then
    /// fires due delayed calls. Call this repeatedly from the application's
    /// event loop.
    pub fn process_events(&mut self) -> Result<(), NodeError> {
        let elements = self.transport.receive().context(TransportSnafu)?;
        for element in elements {
            self.on_received_element(&element);
        }
        for callback in self.dct.extract_due() {
            callback(self);
        }
        Ok(())
    }

    /// Schedules `callback` on this node's delayed-call table.
    pub fn call_later(
        &mut self,
        delay: Milliseconds,
        callback: impl FnOnce(&mut Node) + 'static,
    ) {
        self.dct.call_later(delay, Box::new(callback));
    }

    /// Dispatches one whole inbound TLV element. Malformed elements are
    /// logged and discarded; decode failures never propagate to the event
    /// loop.
    pub fn on_received_element(&mut self, element: &[u8]) {
        let Ok((_, outer_type)) = tlv::parser::var_number(element) else {
            warn!("discarding inbound frame with an unreadable TLV type");
            return;
        };
        match outer_type {
            tlv::LP_PACKET => self.dispatch_lp_packet(element),
            tlv::INTEREST => match default_wire_format().decode_interest(element) {
                Ok(interest) => self.dispatch_interest(&interest),
                Err(error) => warn!("discarding undecodable interest: {error}"),
            },
            tlv::DATA => match default_wire_format().decode_data(element) {
                Ok(data) => self.dispatch_data(data),
                Err(error) => warn!("discarding undecodable data: {error}"),
            },
            other => warn!("discarding inbound frame with unhandled TLV type {other}"),
        }
    }

    fn dispatch_lp_packet(&mut self, element: &[u8]) {
        let lp = match default_wire_format().decode_lp_packet(element) {
            Ok(lp) => lp,
            Err(error) => {
                warn!("discarding undecodable link protocol frame: {error}");
                return;
            }
        };
        let fragment = lp.fragment().clone();
        let Ok((_, inner_type)) = tlv::parser::var_number(&fragment) else {
            warn!("discarding link protocol frame without a readable fragment");
            return;
        };
        if let Some(nack) = lp.nack().copied() {
            if inner_type != tlv::INTEREST {
                warn!("discarding nack whose fragment is not an interest");
                return;
            }
            // Find pending entries by wire equality with the nacked
            // Interest. Entries without a nack callback are left to time
            // out.
            for entry in self.pit.extract_entries_for_nack(&fragment) {
                if let PendingKind::User { on_network_nack: Some(callback), .. } = entry.kind {
                    callback(&entry.interest, &nack);
                }
            }
            return;
        }
        match inner_type {
            tlv::DATA => match default_wire_format().decode_data(&fragment) {
                Ok(mut data) => {
                    data.set_incoming_face_id(lp.incoming_face_id());
                    data.set_congestion_mark(lp.congestion_mark());
                    self.dispatch_data(data);
                }
                Err(error) => warn!("discarding undecodable wrapped data: {error}"),
            },
            tlv::INTEREST => match default_wire_format().decode_interest(&fragment) {
                Ok(interest) => self.dispatch_interest(&interest),
                Err(error) => warn!("discarding undecodable wrapped interest: {error}"),
            },
            other => warn!("discarding wrapped frame with unhandled TLV type {other}"),
        }
    }

    fn dispatch_data(&mut self, data: Data) {
        for entry in self.pit.extract_entries_for_data(&data) {
            match entry.kind {
                PendingKind::User { on_data, .. } => {
                    if let Some(callback) = on_data {
                        callback(&entry.interest, &data);
                    }
                }
                PendingKind::Register(info) => self.handle_register_response(*info, &data),
            }
        }
    }

    fn dispatch_interest(&mut self, interest: &Interest) {
        for (id, filter) in self.ift.matched_filters(interest.name()) {
            if let Some(entry) = self.ift.entry_mut(id) {
                (entry.on_interest)(filter.prefix(), interest, id, &filter);
            }
        }
    }

    fn handle_register_response(&mut self, info: RegisterInfo, data: &Data) {
        let response = match default_wire_format().decode_control_response(data.content()) {
            Ok(response) => response,
            Err(error) => {
                warn!("register prefix: undecodable control response: {error}");
                (info.on_register_failed)(&info.prefix);
                return;
            }
        };
        if response.status_code() != 200 {
            warn!(
                "register prefix for {} failed: status {} {}",
                info.prefix,
                response.status_code(),
                response.status_text()
            );
            (info.on_register_failed)(&info.prefix);
            return;
        }
        let related = info.on_interest.map(|on_interest| {
            let filter_id = next_entry_id();
            self.ift
                .set_interest_filter(filter_id, InterestFilter::new(info.prefix.clone()), on_interest);
            filter_id
        });
        if !self.rpt.add(info.registered_prefix_id, info.prefix.clone(), related) {
            // Removal raced ahead of the response; cascade and stay quiet.
            if let Some(filter_id) = related {
                self.ift.unset_interest_filter(filter_id);
            }
            return;
        }
        debug!("registered prefix {}", info.prefix);
        if let Some(on_success) = info.on_register_success {
            on_success(&info.prefix, info.registered_prefix_id);
        }
    }

    fn process_interest_timeout(&mut self, id: u64) {
        // A tombstoned or already resolved entry is simply absent.
        if let Some(entry) = self.pit.extract_entry(id) {
            match entry.kind {
                PendingKind::User { on_timeout, .. } => {
                    if let Some(callback) = on_timeout {
                        callback(&entry.interest);
                    }
                }
                PendingKind::Register(info) => (info.on_register_failed)(&info.prefix),
            }
        }
    }

    fn connect_if_needed(&mut self) -> Result<(), NodeError> {
        if self.connect_status == ConnectStatus::ConnectComplete {
            return Ok(());
        }
        self.connect_status = ConnectStatus::ConnectRequested;
        match self.transport.connect() {
            Ok(()) => {
                self.connect_status = ConnectStatus::ConnectComplete;
                Ok(())
            }
            Err(error) => {
                self.connect_status = ConnectStatus::Unconnected;
                Err(NodeError::Transport { source: error })
            }
        }
    }

    /// True if the transport reaches a forwarder on this host.
    pub fn is_local(&self) -> bool {
        self.transport.is_local()
    }

    /// Closes the transport connection.
    pub fn shutdown(&mut self) -> Result<(), NodeError> {
        self.connect_status = ConnectStatus::Unconnected;
        self.transport.close().context(TransportSnafu)
    }

    /// The number of Interests awaiting resolution.
    pub fn pending_interest_count(&self) -> usize {
        self.pit.len()
    }

    /// The number of installed interest filters.
    pub fn interest_filter_count(&self) -> usize {
        self.ift.len()
    }

    /// The number of live registrations, with their prefixes.
    pub fn registered_prefixes(&self) -> Vec<(Name, u64)> {
        self.rpt
            .entries()
            .map(|(prefix, id)| (prefix.clone(), id))
            .collect()
    }

    /// Shifts this node's clock by `offset_ms`. Test support for driving
    /// timeouts without sleeping.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.dct.set_now_offset_ms(offset_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::testing::key_chain_with_identity;
    use crate::types::{Blob, ControlResponse, LpPacket, NackReason, Signature};
    use crate::wire::{TlvWireFormat, WireFormat};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[derive(Default)]
    struct Shared {
        sent: RefCell<Vec<Vec<u8>>>,
        incoming: RefCell<VecDeque<Vec<u8>>>,
    }

    struct MockTransport {
        shared: Rc<Shared>,
    }

    impl Transport for MockTransport {
        fn connect(&mut self) -> std::io::Result<()> {
            Ok(())
        }

        fn is_local(&self) -> bool {
            true
        }

        fn send(&mut self, wire: &[u8]) -> std::io::Result<()> {
            self.shared.sent.borrow_mut().push(wire.to_vec());
            Ok(())
        }

        fn receive(&mut self) -> std::io::Result<Vec<Vec<u8>>> {
            Ok(self.shared.incoming.borrow_mut().drain(..).collect())
        }

        fn close(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn node_with_shared() -> (Node, Rc<Shared>) {
        let shared = Rc::new(Shared::default());
        let node = Node::new(Box::new(MockTransport { shared: shared.clone() }));
        (node, shared)
    }

    fn signed_data(uri: &str) -> Data {
        let mut data = Data::new(name(uri));
        data.set_signature(Signature::DigestSha256 { signature: Blob::from(vec![0u8; 32]) });
        data
    }

    #[test]
    fn data_satisfies_pending_interest_exactly_once() {
        let (mut node, shared) = node_with_shared();
        let mut interest = Interest::new(name("/a/b"));
        interest.set_can_be_prefix(true);
        interest.set_interest_lifetime(1000);

        let on_data_count = Rc::new(Cell::new(0));
        let on_timeout_fired = Rc::new(Cell::new(false));
        let data_count = on_data_count.clone();
        let timeout_fired = on_timeout_fired.clone();
        node.express_interest(
            interest,
            Box::new(move |interest, data| {
                assert_eq!(name("/a/b"), *interest.name());
                assert_eq!(name("/a/b/c"), *data.name());
                data_count.set(data_count.get() + 1);
            }),
            Some(Box::new(move |_| timeout_fired.set(true))),
            None,
        )
        .unwrap();
        assert_eq!(1, shared.sent.borrow().len());
        assert_eq!(1, node.pending_interest_count());

        let wire = TlvWireFormat.encode_data(&signed_data("/a/b/c")).unwrap();
        shared.incoming.borrow_mut().push_back(wire.as_ref().to_vec());
        node.process_events().unwrap();
        assert_eq!(1, on_data_count.get());
        assert_eq!(0, node.pending_interest_count());

        // The timeout finds the tombstone and stays silent.
        node.set_now_offset_ms(2000);
        node.process_events().unwrap();
        assert_eq!(1, on_data_count.get());
        assert!(!on_timeout_fired.get());
    }

    #[test]
    fn unanswered_interest_times_out_once() {
        let (mut node, _shared) = node_with_shared();
        let mut interest = Interest::new(name("/x"));
        interest.set_interest_lifetime(500);

        let timeouts = Rc::new(Cell::new(0));
        let timeouts_in_callback = timeouts.clone();
        node.express_interest(
            interest,
            Box::new(|_, _| panic!("no data expected")),
            Some(Box::new(move |interest| {
                assert_eq!(name("/x"), *interest.name());
                timeouts_in_callback.set(timeouts_in_callback.get() + 1);
            })),
            None,
        )
        .unwrap();

        node.process_events().unwrap();
        assert_eq!(0, timeouts.get());

        node.set_now_offset_ms(600);
        node.process_events().unwrap();
        assert_eq!(1, timeouts.get());
        assert_eq!(0, node.pending_interest_count());

        node.set_now_offset_ms(2000);
        node.process_events().unwrap();
        assert_eq!(1, timeouts.get());
    }

    #[test]
    fn nack_resolves_only_entries_with_a_nack_callback() {
        let (mut node, shared) = node_with_shared();
        let nacked = Rc::new(Cell::new(false));
        let nacked_in_callback = nacked.clone();
        node.express_interest(
            Interest::new(name("/n")),
            Box::new(|_, _| panic!("no data expected")),
            None,
            Some(Box::new(move |_, nack| {
                assert_eq!(NackReason::NoRoute, nack.reason());
                nacked_in_callback.set(true);
            })),
        )
        .unwrap();

        // Wrap the exact sent wire in a Nack frame.
        let sent = shared.sent.borrow().last().unwrap().clone();
        let mut lp = LpPacket::new();
        lp.set_fragment(sent);
        lp.set_nack(NetworkNack::new(NackReason::NoRoute));
        let frame = TlvWireFormat.encode_lp_packet(&lp).unwrap();
        shared.incoming.borrow_mut().push_back(frame.to_vec());
        node.process_events().unwrap();
        assert!(nacked.get());
        assert_eq!(0, node.pending_interest_count());
    }

    #[test]
    fn wrapped_data_carries_the_lp_headers() {
        let (mut node, shared) = node_with_shared();
        let seen = Rc::new(Cell::new(false));
        let seen_in_callback = seen.clone();
        let mut interest = Interest::new(name("/h"));
        interest.set_can_be_prefix(true);
        node.express_interest(
            interest,
            Box::new(move |_, data| {
                assert_eq!(Some(9), data.incoming_face_id());
                assert_eq!(Some(1), data.congestion_mark());
                seen_in_callback.set(true);
            }),
            None,
            None,
        )
        .unwrap();

        let wire = TlvWireFormat.encode_data(&signed_data("/h/1")).unwrap();
        let mut lp = LpPacket::new();
        lp.set_fragment(wire.as_ref().to_vec());
        lp.set_incoming_face_id(9);
        lp.set_congestion_mark(1);
        let frame = TlvWireFormat.encode_lp_packet(&lp).unwrap();
        shared.incoming.borrow_mut().push_back(frame.to_vec());
        node.process_events().unwrap();
        assert!(seen.get());
    }

    #[test]
    fn interest_filters_dispatch_in_insertion_order() {
        let (mut node, shared) = node_with_shared();
        let calls = Rc::new(RefCell::new(Vec::new()));
        for (tag, prefix) in [("first", "/app"), ("second", "/app/sub")] {
            let calls = calls.clone();
            node.set_interest_filter(
                name(prefix),
                Box::new(move |prefix, interest, _, _| {
                    assert!(prefix.is_prefix_of(interest.name()));
                    calls.borrow_mut().push(tag);
                }),
            );
        }
        let wire = TlvWireFormat
            .encode_interest(&Interest::new(name("/app/sub/x")))
            .unwrap();
        shared.incoming.borrow_mut().push_back(wire.as_ref().to_vec());
        node.process_events().unwrap();
        assert_eq!(vec!["first", "second"], *calls.borrow());
    }

    #[test]
    fn oversized_packets_fail_before_any_io() {
        let (mut node, shared) = node_with_shared();

        let mut data = Data::new(name("/big"));
        data.set_content(vec![0u8; 9000]);
        let error = node.put_data(&data).unwrap_err();
        assert!(matches!(
            error,
            NodeError::Encode { source: EncodeError::SizeExceeded { .. } }
        ));
        assert!(shared.sent.borrow().is_empty());

        // Trim the content so the whole packet is exactly at the limit.
        let overhead = data.wire_encode().unwrap().len() - 9000;
        data.set_content(vec![0u8; MAX_NDN_PACKET_SIZE - overhead]);
        assert_eq!(MAX_NDN_PACKET_SIZE, data.wire_encode().unwrap().len());
        node.put_data(&data).unwrap();
        assert_eq!(1, shared.sent.borrow().len());

        // One byte more fails again.
        data.set_content(vec![0u8; MAX_NDN_PACKET_SIZE - overhead + 1]);
        assert!(node.put_data(&data).is_err());
        assert_eq!(1, shared.sent.borrow().len());
    }

    #[test]
    fn remove_pending_interest_before_timeout_silences_it() {
        let (mut node, _shared) = node_with_shared();
        let mut interest = Interest::new(name("/r"));
        interest.set_interest_lifetime(100);
        let id = node
            .express_interest(
                interest,
                Box::new(|_, _| panic!("no data expected")),
                Some(Box::new(|_| panic!("timeout should be cancelled"))),
                None,
            )
            .unwrap();
        node.remove_pending_interest(id);
        node.remove_pending_interest(id);
        node.set_now_offset_ms(500);
        node.process_events().unwrap();
        assert_eq!(0, node.pending_interest_count());
    }

    #[test]
    fn register_prefix_round_trip_with_the_forwarder() {
        let (mut node, shared) = node_with_shared();
        let (mut key_chain, certificate_name) = key_chain_with_identity("/command/signer");

        let succeeded = Rc::new(Cell::new(false));
        let interests_seen = Rc::new(Cell::new(0));
        let succeeded_in_callback = succeeded.clone();
        let interests_in_callback = interests_seen.clone();
        node.register_prefix(
            name("/app"),
            Some(Box::new(move |_, _, _, _| {
                interests_in_callback.set(interests_in_callback.get() + 1);
            })),
            Box::new(|_| panic!("registration should succeed")),
            Some(Box::new(move |prefix, _| {
                assert_eq!(name("/app"), *prefix);
                succeeded_in_callback.set(true);
            })),
            ForwardingFlags::default(),
            &mut key_chain,
            &certificate_name,
        )
        .unwrap();

        // The node sent a signed command interest to the RIB.
        let sent = shared.sent.borrow().last().unwrap().clone();
        let command = TlvWireFormat.decode_interest(&sent).unwrap();
        assert!(name("/localhost/nfd/rib/register").is_prefix_of(command.name()));
        // ControlParameters + timestamp, nonce, signature info and value.
        assert_eq!(9, command.name().len());

        // Answer as the forwarder would.
        let mut response = ControlResponse::new(200, "OK");
        let mut body = ControlParameters::new();
        body.set_name(name("/app"));
        response.set_body(body);
        let mut reply = Data::new(command.name().clone());
        reply.set_content(
            TlvWireFormat
                .encode_control_response(&response)
                .unwrap()
                .to_vec(),
        );
        reply.set_signature(Signature::DigestSha256 { signature: Blob::from(vec![0u8; 32]) });
        let wire = TlvWireFormat.encode_data(&reply).unwrap();
        shared.incoming.borrow_mut().push_back(wire.as_ref().to_vec());
        node.process_events().unwrap();

        assert!(succeeded.get());
        assert_eq!(1, node.interest_filter_count());
        assert_eq!(1, node.registered_prefixes().len());

        // A matching Interest now reaches the registered callback.
        let wire = TlvWireFormat
            .encode_interest(&Interest::new(name("/app/item")))
            .unwrap();
        shared.incoming.borrow_mut().push_back(wire.as_ref().to_vec());
        node.process_events().unwrap();
        assert_eq!(1, interests_seen.get());

        // Removing the registration cascades to the filter.
        let (_, id) = node.registered_prefixes()[0].clone();
        node.remove_registered_prefix(id);
        assert_eq!(0, node.interest_filter_count());
    }

    #[test]
    fn register_prefix_failure_status_reports_failure() {
        let (mut node, shared) = node_with_shared();
        let (mut key_chain, certificate_name) = key_chain_with_identity("/command/signer");

        let failed = Rc::new(Cell::new(false));
        let failed_in_callback = failed.clone();
        node.register_prefix(
            name("/app"),
            None,
            Box::new(move |prefix| {
                assert_eq!(name("/app"), *prefix);
                failed_in_callback.set(true);
            }),
            Some(Box::new(|_, _| panic!("success not expected"))),
            ForwardingFlags::default(),
            &mut key_chain,
            &certificate_name,
        )
        .unwrap();

        let sent = shared.sent.borrow().last().unwrap().clone();
        let command = TlvWireFormat.decode_interest(&sent).unwrap();
        let response = ControlResponse::new(403, "Forbidden");
        let mut reply = Data::new(command.name().clone());
        reply.set_content(
            TlvWireFormat
                .encode_control_response(&response)
                .unwrap()
                .to_vec(),
        );
        reply.set_signature(Signature::DigestSha256 { signature: Blob::from(vec![0u8; 32]) });
        let wire = TlvWireFormat.encode_data(&reply).unwrap();
        shared.incoming.borrow_mut().push_back(wire.as_ref().to_vec());
        node.process_events().unwrap();

        assert!(failed.get());
        assert_eq!(0, node.registered_prefixes().len());
    }
}
