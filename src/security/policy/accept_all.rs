//! The policy that accepts everything.

use crate::error::ValidationError;
use crate::security::policy::{PolicyAction, ValidationPolicy};
use crate::security::ValidationState;
use crate::types::{Data, Interest};

/// Bypasses validation for every Data and Interest. Useful in tests and
/// closed environments only.
#[derive(Default)]
pub struct ValidationPolicyAcceptAll {
    inner: Option<Box<dyn ValidationPolicy>>,
}

impl ValidationPolicyAcceptAll {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValidationPolicy for ValidationPolicyAcceptAll {
    fn check_data_policy(
        &mut self,
        _data: &Data,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        Ok(PolicyAction::Bypass)
    }

    fn check_interest_policy(
        &mut self,
        _interest: &Interest,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        Ok(PolicyAction::Bypass)
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
