//! Command interests: authenticated Interests with a timestamp, nonce, and
//! signature appended to the name.

use crate::clock;
use crate::error::DecodeError;
use crate::security::{KeyChain, KeyChainError};
use crate::types::{Component, Interest, Name, Signature};
use crate::wire::default_wire_format;

/// The number of components a signed command Interest appends: timestamp,
/// nonce, SignatureInfo, SignatureValue.
pub const COMMAND_INTEREST_COMPONENT_COUNT: usize = 4;

/// Appends the timestamp and random-nonce components of a command
/// Interest, keeping timestamps strictly increasing across calls.
pub struct CommandInterestPreparer {
    last_used_timestamp_ms: u64,
    now_offset_ms: i64,
}

impl Default for CommandInterestPreparer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInterestPreparer {
    pub fn new() -> Self {
        Self { last_used_timestamp_ms: 0, now_offset_ms: 0 }
    }

    /// Appends a timestamp component (milliseconds since the epoch as a
    /// big-endian non-negative integer) and an 8-byte random nonce. The
    /// timestamp is advanced past the previous one when the clock has not
    /// moved.
    pub fn prepare_command_interest_name(&mut self, interest: &mut Interest) {
        let mut timestamp = clock::offset_now_ms(self.now_offset_ms);
        if timestamp <= self.last_used_timestamp_ms {
            timestamp = self.last_used_timestamp_ms + 1;
        }
        self.last_used_timestamp_ms = timestamp;
        interest.name_mut().append(Component::from_number(timestamp));
        interest
            .name_mut()
            .append(Component::new(rand::random::<[u8; 8]>().to_vec()));
    }

    /// Shifts this preparer's clock. Test support.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.now_offset_ms = offset_ms;
    }
}

/// Prepares and signs command Interests: timestamp, nonce, SignatureInfo,
/// SignatureValue appended to the name, in that order.
pub struct CommandInterestSigner {
    preparer: CommandInterestPreparer,
}

impl Default for CommandInterestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInterestSigner {
    pub fn new() -> Self {
        Self { preparer: CommandInterestPreparer::new() }
    }

    /// Turns `interest` into a signed command Interest. If the Interest
    /// lifetime is unset, it defaults to one second.
    pub fn sign(
        &mut self,
        interest: &mut Interest,
        key_chain: &mut KeyChain,
        certificate_name: &Name,
    ) -> Result<(), KeyChainError> {
        self.preparer.prepare_command_interest_name(interest);
        key_chain.sign_interest(interest, certificate_name)?;
        if interest.interest_lifetime().is_none() {
            interest.set_interest_lifetime(1000);
        }
        Ok(())
    }

    /// Shifts the embedded preparer's clock. Test support.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.preparer.set_now_offset_ms(offset_ms);
    }
}

/// Decodes the signature a signed Interest carries in its two final name
/// components.
pub fn extract_interest_signature(interest: &Interest) -> Result<Signature, DecodeError> {
    let name = interest.name();
    let (Some(info), Some(value)) = (name.get(-2), name.get(-1)) else {
        return Err(DecodeError::MissingField { field: "Interest signature components" });
    };
    default_wire_format().decode_signature_info_and_value(info.value(), value.value())
}

/// The timestamp of a signed command Interest, read from the fourth
/// component from the end.
pub fn extract_command_timestamp(interest: &Interest) -> Result<u64, DecodeError> {
    let component = interest
        .name()
        .get(-(COMMAND_INTEREST_COMPONENT_COUNT as isize))
        .ok_or(DecodeError::MissingField { field: "command Interest timestamp" })?;
    component.to_number()
}
