//! The state threaded through one validation.

use std::collections::HashSet;

use crate::error::{ValidationError, ValidationErrorCode};
use crate::security::CertificateV2;
use crate::types::Name;

/// Carries the certificate chain accumulated while validating one packet,
/// plus hooks to run if the validation ultimately succeeds.
///
/// Policies use the hooks for effects that must not happen on failure,
/// e.g. the command-interest policy records a timestamp only once the
/// signature chain has verified.
#[derive(Default)]
pub struct ValidationState {
    chain: Vec<CertificateV2>,
    seen_certificate_names: HashSet<Name>,
    success_hooks: Vec<Box<dyn FnOnce()>>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of certificates accumulated so far.
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// The chain, ordered from the packet's signer toward the trust
    /// anchor.
    pub fn chain(&self) -> &[CertificateV2] {
        &self.chain
    }

    /// Appends a certificate, rejecting the second occurrence of any
    /// certificate name as a loop.
    pub fn add_certificate(&mut self, certificate: CertificateV2) -> Result<(), ValidationError> {
        if !self
            .seen_certificate_names
            .insert(certificate.name().clone())
        {
            return Err(ValidationError::new(
                ValidationErrorCode::LoopDetected,
                format!("certificate {} appears twice in the chain", certificate.name()),
            ));
        }
        self.chain.push(certificate);
        Ok(())
    }

    /// Registers a hook to run when the whole validation succeeds.
    pub fn add_success_hook(&mut self, hook: impl FnOnce() + 'static) {
        self.success_hooks.push(Box::new(hook));
    }

    pub(crate) fn run_success_hooks(&mut self) {
        for hook in self.success_hooks.drain(..) {
            hook();
        }
    }

    /// Drops the first `count` chain certificates, the ones whose
    /// signatures never verified.
    pub(crate) fn drop_unverified(&mut self, count: usize) {
        self.chain.drain(..count.min(self.chain.len()));
    }

    /// Removes and returns the whole chain, e.g. to move it into the
    /// verified cache.
    pub(crate) fn take_chain(&mut self) -> Vec<CertificateV2> {
        core::mem::take(&mut self.chain)
    }
}
