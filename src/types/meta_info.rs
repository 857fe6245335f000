//! The MetaInfo block of a Data packet.

use crate::types::{ChangeCounter, Component, Milliseconds};

/// The kind of payload a Data packet carries.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContentType {
    /// Opaque application bytes.
    #[default]
    Blob,
    /// A Link payload holding a delegation set.
    Link,
    /// A public key.
    Key,
    /// An application-level negative acknowledgement.
    Nack,
    /// Any other numeric content-type code, preserved for round-tripping.
    Other(u64),
}

impl ContentType {
    pub fn number(self) -> u64 {
        match self {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(code) => code,
        }
    }

    pub fn from_number(code: u64) -> Self {
        match code {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            code => ContentType::Other(code),
        }
    }
}

/// Freshness and final-block metadata carried next to a Data's content.
#[derive(Clone, Debug, Default)]
pub struct MetaInfo {
    content_type: ContentType,
    freshness_period: Option<Milliseconds>,
    final_block_id: Option<Component>,
    change: ChangeCounter,
}

impl MetaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = content_type;
        self.change.bump();
        self
    }

    /// How long a cached copy stays fresh, if bounded.
    pub fn freshness_period(&self) -> Option<Milliseconds> {
        self.freshness_period
    }

    pub fn set_freshness_period(&mut self, period: impl Into<Option<Milliseconds>>) -> &mut Self {
        self.freshness_period = period.into();
        self.change.bump();
        self
    }

    /// The final block in a segmented stream, when announced.
    pub fn final_block_id(&self) -> Option<&Component> {
        self.final_block_id.as_ref()
    }

    pub fn set_final_block_id(&mut self, component: impl Into<Option<Component>>) -> &mut Self {
        self.final_block_id = component.into();
        self.change.bump();
        self
    }

    pub(crate) fn change_count(&self) -> u64 {
        self.change.get()
    }
}

impl PartialEq for MetaInfo {
    fn eq(&self, other: &Self) -> bool {
        self.content_type == other.content_type
            && self.freshness_period == other.freshness_period
            && self.final_block_id == other.final_block_id
    }
}

impl Eq for MetaInfo {}
