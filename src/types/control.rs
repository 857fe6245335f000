//! NFD management types: ControlParameters commands and ControlResponse
//! replies.

use crate::types::{Milliseconds, Name};

/// The flags of a prefix registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ForwardingFlags {
    child_inherit: bool,
    capture: bool,
}

impl Default for ForwardingFlags {
    fn default() -> Self {
        Self { child_inherit: true, capture: false }
    }
}

impl ForwardingFlags {
    const NFD_CHILD_INHERIT: u64 = 1;
    const NFD_CAPTURE: u64 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_inherit(&self) -> bool {
        self.child_inherit
    }

    pub fn set_child_inherit(&mut self, child_inherit: bool) -> &mut Self {
        self.child_inherit = child_inherit;
        self
    }

    pub fn capture(&self) -> bool {
        self.capture
    }

    pub fn set_capture(&mut self, capture: bool) -> &mut Self {
        self.capture = capture;
        self
    }

    /// The flags word used in an NFD RIB command.
    pub fn nfd_forwarding_flags(&self) -> u64 {
        let mut flags = 0;
        if self.child_inherit {
            flags |= Self::NFD_CHILD_INHERIT;
        }
        if self.capture {
            flags |= Self::NFD_CAPTURE;
        }
        flags
    }

    pub fn from_nfd_forwarding_flags(flags: u64) -> Self {
        Self {
            child_inherit: flags & Self::NFD_CHILD_INHERIT != 0,
            capture: flags & Self::NFD_CAPTURE != 0,
        }
    }
}

/// The parameters of an NFD management command such as
/// `/localhost/nfd/rib/register`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlParameters {
    name: Option<Name>,
    face_id: Option<u64>,
    uri: String,
    local_control_feature: Option<u64>,
    origin: Option<u64>,
    cost: Option<u64>,
    forwarding_flags: ForwardingFlags,
    strategy: Name,
    expiration_period: Option<Milliseconds>,
}

impl ControlParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: impl Into<Option<Name>>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn face_id(&self) -> Option<u64> {
        self.face_id
    }

    pub fn set_face_id(&mut self, face_id: impl Into<Option<u64>>) -> &mut Self {
        self.face_id = face_id.into();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = uri.into();
        self
    }

    pub fn local_control_feature(&self) -> Option<u64> {
        self.local_control_feature
    }

    pub fn set_local_control_feature(&mut self, feature: impl Into<Option<u64>>) -> &mut Self {
        self.local_control_feature = feature.into();
        self
    }

    pub fn origin(&self) -> Option<u64> {
        self.origin
    }

    pub fn set_origin(&mut self, origin: impl Into<Option<u64>>) -> &mut Self {
        self.origin = origin.into();
        self
    }

    pub fn cost(&self) -> Option<u64> {
        self.cost
    }

    pub fn set_cost(&mut self, cost: impl Into<Option<u64>>) -> &mut Self {
        self.cost = cost.into();
        self
    }

    pub fn forwarding_flags(&self) -> &ForwardingFlags {
        &self.forwarding_flags
    }

    pub fn set_forwarding_flags(&mut self, flags: ForwardingFlags) -> &mut Self {
        self.forwarding_flags = flags;
        self
    }

    pub fn strategy(&self) -> &Name {
        &self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Name) -> &mut Self {
        self.strategy = strategy;
        self
    }

    pub fn expiration_period(&self) -> Option<Milliseconds> {
        self.expiration_period
    }

    pub fn set_expiration_period(&mut self, period: impl Into<Option<Milliseconds>>) -> &mut Self {
        self.expiration_period = period.into();
        self
    }
}

/// The reply to an NFD management command: a status plus an optional echo
/// of the applied parameters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlResponse {
    status_code: u32,
    status_text: String,
    body: Option<ControlParameters>,
}

impl ControlResponse {
    pub fn new(status_code: u32, status_text: impl Into<String>) -> Self {
        Self { status_code, status_text: status_text.into(), body: None }
    }

    pub fn status_code(&self) -> u32 {
        self.status_code
    }

    pub fn set_status_code(&mut self, code: u32) -> &mut Self {
        self.status_code = code;
        self
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn set_status_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.status_text = text.into();
        self
    }

    pub fn body(&self) -> Option<&ControlParameters> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Option<ControlParameters>>) -> &mut Self {
        self.body = body.into();
        self
    }
}
