//! A thread-safe wrapper serializing node operations onto the event
//! thread.

use std::sync::mpsc;

use tracing::warn;

use crate::node::{next_entry_id, Node, NodeError, OnInterest};
use crate::node::interest_filter::InterestFilter;
use crate::types::{Data, Interest, Name, NetworkNack};

type NodeCommand = Box<dyn FnOnce(&mut Node) + Send>;

/// Owns a [`Node`] on the event thread and drains operations posted by
/// [`NodeHandle`]s from other threads.
///
/// There are no internal locks: every table mutation still happens on the
/// thread calling [`ThreadsafeNode::process_events`], in the order the
/// operations arrived.
pub struct ThreadsafeNode {
    node: Node,
    sender: mpsc::Sender<NodeCommand>,
    receiver: mpsc::Receiver<NodeCommand>,
}

impl ThreadsafeNode {
    pub fn new(node: Node) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { node, sender, receiver }
    }

    /// A cloneable handle other threads use to post operations.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle { sender: self.sender.clone() }
    }

    /// Direct access to the node, for use on the event thread only.
    pub fn node(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Runs every posted operation, then polls the transport and fires due
    /// delayed calls.
    pub fn process_events(&mut self) -> Result<(), NodeError> {
        while let Ok(command) = self.receiver.try_recv() {
            command(&mut self.node);
        }
        self.node.process_events()
    }
}

/// Posts node operations from any thread; they run in the event thread's
/// context at its next [`ThreadsafeNode::process_events`].
#[derive(Clone)]
pub struct NodeHandle {
    sender: mpsc::Sender<NodeCommand>,
}

impl NodeHandle {
    /// Posts an arbitrary operation. Returns false if the owning node is
    /// gone.
    pub fn dispatch(&self, operation: impl FnOnce(&mut Node) + Send + 'static) -> bool {
        self.sender.send(Box::new(operation)).is_ok()
    }

    /// Expresses an Interest from a foreign thread. The entry id is
    /// allocated immediately (the counter is atomic) and returned; the
    /// send itself happens on the event thread.
    pub fn express_interest(
        &self,
        interest: Interest,
        on_data: impl FnOnce(&Interest, &Data) + Send + 'static,
        on_timeout: Option<Box<dyn FnOnce(&Interest) + Send>>,
        on_network_nack: Option<Box<dyn FnOnce(&Interest, &NetworkNack) + Send>>,
    ) -> u64 {
        let id = next_entry_id();
        self.dispatch(move |node| {
            let kind = crate::node::pending_interest::PendingKind::User {
                on_data: Some(Box::new(on_data)),
                on_timeout: on_timeout.map(|cb| -> crate::node::OnTimeout { Box::new(cb) }),
                on_network_nack: on_network_nack
                    .map(|cb| -> crate::node::OnNetworkNack { Box::new(cb) }),
            };
            if let Err(error) = node.express_interest_entry(id, interest, kind) {
                warn!("dispatched express_interest failed: {error}");
            }
        });
        id
    }

    /// Cancels a pending Interest by id, from any thread.
    pub fn remove_pending_interest(&self, id: u64) {
        self.dispatch(move |node| node.remove_pending_interest(id));
    }

    /// Installs an interest filter from a foreign thread, returning its id
    /// immediately.
    pub fn set_interest_filter(
        &self,
        filter: InterestFilter,
        on_interest: impl FnMut(&Name, &Interest, u64, &InterestFilter) + Send + 'static,
    ) -> u64 {
        let id = next_entry_id();
        self.dispatch(move |node| {
            let on_interest: OnInterest = Box::new(on_interest);
            node.set_interest_filter_with_id(id, filter, on_interest);
        });
        id
    }

    pub fn unset_interest_filter(&self, id: u64) {
        self.dispatch(move |node| node.unset_interest_filter(id));
    }

    /// Sends a Data packet from a foreign thread.
    pub fn put_data(&self, data: Data) {
        self.dispatch(move |node| {
            if let Err(error) = node.put_data(&data) {
                warn!("dispatched put_data failed: {error}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct SharedTransport {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Transport for SharedTransport {
        fn connect(&mut self) -> std::io::Result<()> {
            Ok(())
        }

        fn is_local(&self) -> bool {
            true
        }

        fn send(&mut self, wire: &[u8]) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(wire.to_vec());
            Ok(())
        }

        fn receive(&mut self) -> std::io::Result<Vec<Vec<u8>>> {
            Ok(Vec::new())
        }

        fn close(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn operations_posted_from_another_thread_run_in_the_event_thread() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = SharedTransport { sent: sent.clone() };
        let mut node = ThreadsafeNode::new(Node::new(Box::new(transport)));
        let handle = node.handle();

        let worker = std::thread::spawn(move || {
            let interest = Interest::new(Name::from_uri("/from/elsewhere").unwrap());
            handle.express_interest(interest, |_, _| {}, None, None)
        });
        let id = worker.join().unwrap();
        assert!(id > 0);

        // Nothing happens until the event thread drains the queue.
        assert!(sent.lock().unwrap().is_empty());
        node.process_events().unwrap();
        assert_eq!(1, sent.lock().unwrap().len());
        assert_eq!(1, node.node().pending_interest_count());
    }
}
