//! # Transport contract
//!
//! The dispatch engine sees a byte-oriented send/receive contract only.
//! Concrete sockets live outside this crate; implementations hand whole
//! inbound TLV frames to the node, de-framing with [`ElementReader`] when
//! the underlying byte stream has no message boundaries.

use std::io;

/// The Unix-domain socket paths tried when discovering a local forwarder,
/// in order.
pub const DEFAULT_UNIX_SOCKET_PATHS: [&str; 2] = ["/var/run/nfd.sock", "/tmp/.ndnd.sock"];

/// The TCP endpoint tried when no Unix-domain socket is available.
pub const DEFAULT_TCP_ENDPOINT: &str = "localhost:6363";

/// A byte-oriented connection to a forwarder.
pub trait Transport {
    /// Establishes the connection. Called by the node before the first
    /// send.
    fn connect(&mut self) -> io::Result<()>;

    /// True if the connected forwarder runs on this host, which permits
    /// local-scope operations such as prefix registration.
    fn is_local(&self) -> bool;

    /// Sends one whole encoded packet.
    fn send(&mut self, wire: &[u8]) -> io::Result<()>;

    /// Drains the inbound direction, returning zero or more whole TLV
    /// elements. Must not block when nothing is pending.
    fn receive(&mut self) -> io::Result<Vec<Vec<u8>>>;

    /// Closes the connection.
    fn close(&mut self) -> io::Result<()>;
}

/// Accumulates raw stream bytes and slices out whole TLV elements.
#[derive(Debug, Default)]
pub struct ElementReader {
    buffer: Vec<u8>,
}

impl ElementReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds stream bytes in, returning every element completed by them.
    pub fn on_received_bytes(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);
        let mut elements = Vec::new();
        loop {
            match element_length(&self.buffer) {
                Some(length) if self.buffer.len() >= length => {
                    let rest = self.buffer.split_off(length);
                    elements.push(core::mem::replace(&mut self.buffer, rest));
                }
                _ => break,
            }
        }
        elements
    }

    /// The number of buffered bytes not yet forming a whole element.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// The total length of the TLV element at the front of `buffer`, when its
/// header is complete.
fn element_length(buffer: &[u8]) -> Option<usize> {
    let (rest, (_, length)) = crate::tlv::parser::type_and_length(buffer).ok()?;
    let header = buffer.len() - rest.len();
    Some(header + length as usize)
}
