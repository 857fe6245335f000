//! # Validation policies
//!
//! A policy decides, synchronously, what a packet needs before it can be
//! trusted: nothing ([`PolicyAction::Bypass`]), a certificate
//! ([`PolicyAction::Fetch`]), or rejection (an error). Policies chain:
//! each has at most one inner policy, and
//! [`ValidationPolicy::set_inner_policy`] always appends at the tail.

mod accept_all;
mod command_interest;
mod config;
mod simple_hierarchy;

pub use accept_all::ValidationPolicyAcceptAll;
pub use command_interest::{CommandInterestOptions, ValidationPolicyCommandInterest};
pub use config::{
    ConfigChecker, ConfigFilter, ConfigRule, ConfigSection, ConfigValue, NameRelation,
    ValidationPolicyConfig,
};
pub use simple_hierarchy::ValidationPolicySimpleHierarchy;

use crate::error::{ValidationError, ValidationErrorCode};
use crate::security::command_interest::extract_interest_signature;
use crate::security::{CertificateRequest, CertificateStorage, ValidationState};
use crate::types::{Data, Interest, Name};

/// What a policy concluded about a packet.
pub enum PolicyAction {
    /// The packet needs no certificate; accept it without a signature
    /// check.
    Bypass,
    /// Fetch this certificate and continue validating with it.
    Fetch(CertificateRequest),
}

/// One link of a policy chain.
pub trait ValidationPolicy {
    fn check_data_policy(
        &mut self,
        data: &Data,
        state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError>;

    fn check_interest_policy(
        &mut self,
        interest: &Interest,
        state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError>;

    /// Appends `policy` at the tail of the chain.
    fn set_inner_policy(&mut self, policy: Box<dyn ValidationPolicy>);

    fn inner_policy_mut(&mut self) -> Option<&mut (dyn ValidationPolicy + 'static)>;

    /// Loads any trust anchors this policy (or its chain) is configured
    /// with into `storage`. Called when a validator adopts the policy.
    fn collect_trust_anchors(&mut self, storage: &mut CertificateStorage) {
        if let Some(inner) = self.inner_policy_mut() {
            inner.collect_trust_anchors(storage);
        }
    }
}

/// The key name from a Data's signature key locator.
pub fn data_key_locator_name(data: &Data) -> Result<Name, ValidationError> {
    match data.signature().key_locator().key_name() {
        Some(name) => Ok(name.clone()),
        None => Err(ValidationError::new(
            ValidationErrorCode::InvalidKeyLocator,
            format!("data {} has no KeyName key locator", data.name()),
        )),
    }
}

/// The key name from a signed Interest's appended SignatureInfo.
pub fn interest_key_locator_name(interest: &Interest) -> Result<Name, ValidationError> {
    if interest.name().len() < 2 {
        return Err(ValidationError::new(
            ValidationErrorCode::NoSignature,
            format!("interest {} carries no signature components", interest.name()),
        ));
    }
    let signature = extract_interest_signature(interest).map_err(|error| {
        ValidationError::new(
            ValidationErrorCode::NoSignature,
            format!("cannot decode interest signature: {error}"),
        )
    })?;
    match signature.key_locator().key_name() {
        Some(name) => Ok(name.clone()),
        None => Err(ValidationError::new(
            ValidationErrorCode::InvalidKeyLocator,
            format!("interest {} has no KeyName key locator", interest.name()),
        )),
    }
}
