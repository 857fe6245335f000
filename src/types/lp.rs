//! NDNLPv2 link-protocol frames: fragments plus per-hop headers.

use core::fmt;

use crate::types::Blob;

/// Why a forwarder refused an Interest.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum NackReason {
    #[default]
    None,
    Congestion,
    Duplicate,
    NoRoute,
    /// Any other reason code, preserved for inspection.
    OtherCode(u32),
}

impl NackReason {
    pub fn number(self) -> u32 {
        match self {
            NackReason::None => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
            NackReason::OtherCode(code) => code,
        }
    }

    pub fn from_number(code: u32) -> Self {
        match code {
            0 => NackReason::None,
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            code => NackReason::OtherCode(code),
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::None => f.write_str("none"),
            NackReason::Congestion => f.write_str("congestion"),
            NackReason::Duplicate => f.write_str("duplicate"),
            NackReason::NoRoute => f.write_str("no route"),
            NackReason::OtherCode(code) => write!(f, "code {code}"),
        }
    }
}

/// A network-level negative acknowledgement for an Interest.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkNack {
    reason: NackReason,
}

impl NetworkNack {
    pub fn new(reason: NackReason) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> NackReason {
        self.reason
    }
}

/// A link-protocol frame wrapping a network packet with per-hop headers.
///
/// Only the headers the dispatch engine consumes are modeled: the Nack
/// header, the incoming face id, and the congestion mark. Unrecognized
/// headers in the protocol's ignorable range are skipped on decode.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LpPacket {
    fragment: Blob,
    nack: Option<NetworkNack>,
    incoming_face_id: Option<u64>,
    congestion_mark: Option<u64>,
}

impl LpPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped network-layer packet bytes.
    pub fn fragment(&self) -> &Blob {
        &self.fragment
    }

    pub fn set_fragment(&mut self, fragment: impl Into<Blob>) -> &mut Self {
        self.fragment = fragment.into();
        self
    }

    pub fn nack(&self) -> Option<&NetworkNack> {
        self.nack.as_ref()
    }

    pub fn set_nack(&mut self, nack: impl Into<Option<NetworkNack>>) -> &mut Self {
        self.nack = nack.into();
        self
    }

    pub fn incoming_face_id(&self) -> Option<u64> {
        self.incoming_face_id
    }

    pub fn set_incoming_face_id(&mut self, face_id: impl Into<Option<u64>>) -> &mut Self {
        self.incoming_face_id = face_id.into();
        self
    }

    pub fn congestion_mark(&self) -> Option<u64> {
        self.congestion_mark
    }

    pub fn set_congestion_mark(&mut self, mark: impl Into<Option<u64>>) -> &mut Self {
        self.congestion_mark = mark.into();
        self
    }
}
