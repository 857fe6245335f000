//! Replay defense for stop-and-wait command Interests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::clock;
use crate::error::{ValidationError, ValidationErrorCode};
use crate::security::command_interest::{
    extract_command_timestamp, COMMAND_INTEREST_COMPONENT_COUNT,
};
use crate::security::policy::{interest_key_locator_name, PolicyAction, ValidationPolicy};
use crate::security::{CertificateStorage, ValidationState};
use crate::types::{Data, Interest, Milliseconds, Name};

/// Tuning for the command-interest timestamp check.
#[derive(Copy, Clone, Debug)]
pub struct CommandInterestOptions {
    /// How far an initial timestamp may deviate from the local clock.
    pub grace_period: Milliseconds,
    /// How many distinct keys to track; -1 is unbounded, 0 disables the
    /// ordering check and treats every command as initial.
    pub max_records: i32,
    /// How long an unrefreshed record lives before the next command from
    /// its key counts as initial again.
    pub record_lifetime: Milliseconds,
}

impl Default for CommandInterestOptions {
    fn default() -> Self {
        Self { grace_period: 2 * 60 * 1000, max_records: 1000, record_lifetime: 3_600_000 }
    }
}

struct Record {
    key_name: Name,
    timestamp: u64,
    last_refreshed: u64,
}

struct RecordContainer {
    // Ordered by last refresh, oldest first, so cleanup pops the front.
    records: VecDeque<Record>,
    now_offset_ms: i64,
}

impl RecordContainer {
    fn now_ms(&self) -> u64 {
        clock::offset_now_ms(self.now_offset_ms)
    }

    fn cleanup(&mut self, record_lifetime: Milliseconds) {
        let now = self.now_ms();
        while let Some(front) = self.records.front() {
            if front.last_refreshed.saturating_add(record_lifetime) <= now {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    fn find(&self, key_name: &Name) -> Option<&Record> {
        self.records.iter().find(|record| record.key_name == *key_name)
    }

    fn refresh(&mut self, key_name: &Name, timestamp: u64, max_records: i32) {
        let now = self.now_ms();
        if let Some(at) = self.records.iter().position(|r| r.key_name == *key_name) {
            self.records.remove(at);
        }
        self.records
            .push_back(Record { key_name: key_name.clone(), timestamp, last_refreshed: now });
        if max_records >= 0 {
            while self.records.len() > max_records as usize {
                self.records.pop_front();
            }
        }
    }
}

/// Checks the timestamp of a signed command Interest against the last one
/// seen from the same key, then delegates signature-shape validation to
/// the wrapped policy.
///
/// The timestamp record is updated only after the whole validation
/// succeeds, so an unverifiable Interest cannot advance another key's
/// clock.
pub struct ValidationPolicyCommandInterest {
    inner: Box<dyn ValidationPolicy>,
    options: CommandInterestOptions,
    records: Rc<RefCell<RecordContainer>>,
}

impl ValidationPolicyCommandInterest {
    pub fn new(inner: Box<dyn ValidationPolicy>, options: CommandInterestOptions) -> Self {
        Self {
            inner,
            options,
            records: Rc::new(RefCell::new(RecordContainer {
                records: VecDeque::new(),
                now_offset_ms: 0,
            })),
        }
    }

    /// Shifts the record clock. Test support.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.records.borrow_mut().now_offset_ms = offset_ms;
    }

    fn check_timestamp(
        &mut self,
        interest: &Interest,
        state: &mut ValidationState,
    ) -> Result<(), ValidationError> {
        self.records.borrow_mut().cleanup(self.options.record_lifetime);

        if interest.name().len() < COMMAND_INTEREST_COMPONENT_COUNT {
            return Err(ValidationError::new(
                ValidationErrorCode::PolicyError,
                format!("{} is too short for a command interest", interest.name()),
            ));
        }
        let timestamp = extract_command_timestamp(interest).map_err(|error| {
            ValidationError::new(
                ValidationErrorCode::PolicyError,
                format!("bad command interest timestamp: {error}"),
            )
        })?;
        let key_name = interest_key_locator_name(interest)?;

        if self.options.max_records != 0 {
            let records = self.records.borrow();
            match records.find(&key_name) {
                Some(record) => {
                    if timestamp <= record.timestamp {
                        return Err(ValidationError::new(
                            ValidationErrorCode::PolicyError,
                            format!(
                                "timestamp {timestamp} is reordered against {}",
                                record.timestamp
                            ),
                        ));
                    }
                }
                None => {
                    let now = records.now_ms();
                    if timestamp.abs_diff(now) > self.options.grace_period {
                        return Err(ValidationError::new(
                            ValidationErrorCode::PolicyError,
                            format!("initial timestamp {timestamp} is outside the grace period"),
                        ));
                    }
                }
            }
        }

        // Commit the record only when the signature chain verifies.
        let records = self.records.clone();
        let max_records = self.options.max_records;
        state.add_success_hook(move || {
            records.borrow_mut().refresh(&key_name, timestamp, max_records);
        });
        Ok(())
    }
}

impl ValidationPolicy for ValidationPolicyCommandInterest {
    fn check_data_policy(
        &mut self,
        data: &Data,
        state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        self.inner.check_data_policy(data, state)
    }

    fn check_interest_policy(
        &mut self,
        interest: &Interest,
        state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        self.check_timestamp(interest, state)?;
        self.inner.check_interest_policy(interest, state)
    }

    fn set_inner_policy(&mut self, policy: Box<dyn ValidationPolicy>) {
        self.inner.set_inner_policy(policy);
    }

    fn inner_policy_mut(&mut self) -> Option<&mut (dyn ValidationPolicy + 'static)> {
        Some(self.inner.as_mut())
    }

    fn collect_trust_anchors(&mut self, storage: &mut CertificateStorage) {
        self.inner.collect_trust_anchors(storage);
    }
}
