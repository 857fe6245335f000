//! The simple-hierarchy policy: packets are signed by an ancestor
//! identity.

use crate::error::{ValidationError, ValidationErrorCode};
use crate::security::policy::{
    data_key_locator_name, interest_key_locator_name, PolicyAction, ValidationPolicy,
};
use crate::security::{CertificateRequest, ValidationState};
use crate::security::command_interest::COMMAND_INTEREST_COMPONENT_COUNT;
use crate::types::{Data, Interest, Name};

/// Requires the signing key's identity to be a prefix of the packet name:
/// `/a` may sign `/a/b/c`, but `/x` may not.
#[derive(Default)]
pub struct ValidationPolicySimpleHierarchy {
    inner: Option<Box<dyn ValidationPolicy>>,
}

impl ValidationPolicySimpleHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(key_locator_name: Name, packet_name: &Name) -> Result<PolicyAction, ValidationError> {
        // The signing identity is the key name without KEY/<key-id>.
        let identity = key_locator_name.get_prefix(-2);
        if identity.is_prefix_of(packet_name) {
            Ok(PolicyAction::Fetch(CertificateRequest::new(Interest::new(
                key_locator_name,
            ))))
        } else {
            Err(ValidationError::new(
                ValidationErrorCode::PolicyError,
                format!("signing identity {identity} does not cover {packet_name}"),
            ))
        }
    }
}

impl ValidationPolicy for ValidationPolicySimpleHierarchy {
    fn check_data_policy(
        &mut self,
        data: &Data,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        Self::check(data_key_locator_name(data)?, data.name())
    }

    fn check_interest_policy(
        &mut self,
        interest: &Interest,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        let packet_name = interest
            .name()
            .get_prefix(-(COMMAND_INTEREST_COMPONENT_COUNT as isize));
        Self::check(interest_key_locator_name(interest)?, &packet_name)
    }

    fn set_inner_policy(&mut self, policy: Box<dyn ValidationPolicy>) {
        match &mut self.inner {
            Some(inner) => inner.set_inner_policy(policy),
            None => self.inner = Some(policy),
        }
    }

    fn inner_policy_mut(&mut self) -> Option<&mut (dyn ValidationPolicy + 'static)> {
        self.inner.as_deref_mut()
    }
}
