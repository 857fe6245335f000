//! The certificate-chain validator.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use snafu::Snafu;
use tracing::debug;

use crate::error::{ValidationError, ValidationErrorCode};
use crate::node::Node;
use crate::security::command_interest::extract_interest_signature;
use crate::security::policy::{PolicyAction, ValidationPolicy};
use crate::security::{CertificateStorage, CertificateV2, ValidationState};
use crate::types::{Data, Interest, NackReason, Name, Signature};

/// A request for one certificate, with its retry budget.
#[derive(Debug)]
pub struct CertificateRequest {
    pub interest: Interest,
    pub retries_left: u32,
}

impl CertificateRequest {
    /// The default number of re-expressions after a timeout or nack.
    pub const DEFAULT_RETRIES: u32 = 3;

    pub fn new(interest: Interest) -> Self {
        Self { interest, retries_left: Self::DEFAULT_RETRIES }
    }
}

/// Why a certificate could not be fetched.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum FetchError {
    #[snafu(display("certificate request for {name} timed out"))]
    Timeout { name: Name },

    #[snafu(display("certificate request for {name} was refused: {reason}"))]
    Nacked { name: Name, reason: NackReason },

    #[snafu(display("certificate fetch failed: {message}"))]
    Failed { message: String },
}

/// Retrieves the certificates the validator asks for.
pub trait CertificateFetcher {
    /// Fetches the certificate `request` names, consuming retries from the
    /// request on recoverable failures.
    fn fetch(&mut self, request: &mut CertificateRequest) -> Result<Data, FetchError>;
}

/// The opaque verification seam: checks `signature` over `signed_portion`
/// against DER-encoded public key bits.
pub trait SignatureVerifier {
    fn verify(&self, signature: &Signature, signed_portion: &[u8], public_key_bits: &[u8]) -> bool;
}

/// Fetches certificates by expressing Interests through a [`Node`],
/// pumping its event loop until each request resolves. Timeouts and nacks
/// consume the request's retries.
pub struct CertificateFetcherFromNetwork {
    face: Rc<RefCell<Node>>,
}

impl CertificateFetcherFromNetwork {
    pub fn new(face: Rc<RefCell<Node>>) -> Self {
        Self { face }
    }
}

impl CertificateFetcher for CertificateFetcherFromNetwork {
    fn fetch(&mut self, request: &mut CertificateRequest) -> Result<Data, FetchError> {
        loop {
            let mut interest = request.interest.clone();
            if interest.interest_lifetime().is_none() {
                interest.set_interest_lifetime(1000);
            }
            let name = interest.name().clone();
            let slot: Rc<RefCell<Option<Result<Data, FetchError>>>> = Rc::new(RefCell::new(None));
            {
                let on_data_slot = slot.clone();
                let on_timeout_slot = slot.clone();
                let on_nack_slot = slot.clone();
                let timeout_name = name.clone();
                let nack_name = name.clone();
                self.face
                    .borrow_mut()
                    .express_interest(
                        interest,
                        Box::new(move |_, data| {
                            *on_data_slot.borrow_mut() = Some(Ok(data.clone()));
                        }),
                        Some(Box::new(move |_| {
                            *on_timeout_slot.borrow_mut() =
                                Some(Err(FetchError::Timeout { name: timeout_name }));
                        })),
                        Some(Box::new(move |_, nack| {
                            *on_nack_slot.borrow_mut() = Some(Err(FetchError::Nacked {
                                name: nack_name,
                                reason: nack.reason(),
                            }));
                        })),
                    )
                    .map_err(|error| FetchError::Failed { message: error.to_string() })?;
            }
            loop {
                let resolved = slot.borrow_mut().take();
                match resolved {
                    Some(Ok(data)) => return Ok(data),
                    Some(Err(error)) => {
                        if request.retries_left == 0 {
                            return Err(error);
                        }
                        request.retries_left -= 1;
                        debug!(
                            "retrying certificate fetch for {name}, {} retries left",
                            request.retries_left
                        );
                        break;
                    }
                    None => {
                        self.face
                            .borrow_mut()
                            .process_events()
                            .map_err(|error| FetchError::Failed { message: error.to_string() })?;
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum PacketRef<'a> {
    Data(&'a Data),
    Interest(&'a Interest),
}

/// Validates packets by building and verifying their certificate chains.
///
/// The policy decides which certificate each packet needs; the fetcher
/// retrieves missing ones; the storage supplies trust anchors and caches.
/// The chain walk is bounded by a depth limit and rejects certificate
/// loops.
pub struct Validator {
    policy: Box<dyn ValidationPolicy>,
    fetcher: Box<dyn CertificateFetcher>,
    verifier: Box<dyn SignatureVerifier>,
    storage: CertificateStorage,
    max_depth: usize,
}

impl Validator {
    /// The default bound on certificate-chain length.
    pub const DEFAULT_MAX_DEPTH: usize = 25;

    pub fn new(
        mut policy: Box<dyn ValidationPolicy>,
        fetcher: Box<dyn CertificateFetcher>,
        verifier: Box<dyn SignatureVerifier>,
    ) -> Self {
        let mut storage = CertificateStorage::new();
        policy.collect_trust_anchors(&mut storage);
        Self { policy, fetcher, verifier, storage, max_depth: Self::DEFAULT_MAX_DEPTH }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn storage(&self) -> &CertificateStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut CertificateStorage {
        &mut self.storage
    }

    pub fn policy_mut(&mut self) -> &mut dyn ValidationPolicy {
        self.policy.as_mut()
    }

    /// Validates a Data packet, invoking exactly one of the callbacks.
    pub fn validate_data(
        &mut self,
        data: &Data,
        on_success: impl FnOnce(&Data),
        on_failure: impl FnOnce(&Data, ValidationError),
    ) {
        match self.run(PacketRef::Data(data)) {
            Ok(()) => on_success(data),
            Err(error) => on_failure(data, error),
        }
    }

    /// Validates a signed Interest, invoking exactly one of the callbacks.
    pub fn validate_interest(
        &mut self,
        interest: &Interest,
        on_success: impl FnOnce(&Interest),
        on_failure: impl FnOnce(&Interest, ValidationError),
    ) {
        match self.run(PacketRef::Interest(interest)) {
            Ok(()) => on_success(interest),
            Err(error) => on_failure(interest, error),
        }
    }

    fn run(&mut self, packet: PacketRef<'_>) -> Result<(), ValidationError> {
        let mut state = ValidationState::new();
        let action = match packet {
            PacketRef::Data(data) => self.policy.check_data_policy(data, &mut state)?,
            PacketRef::Interest(interest) => {
                self.policy.check_interest_policy(interest, &mut state)?
            }
        };
        match action {
            PolicyAction::Bypass => {
                // The policy vouches without a signature check.
                state.run_success_hooks();
                Ok(())
            }
            PolicyAction::Fetch(request) => {
                let trusted = self.build_chain(request, &mut state)?;
                self.verify_chain(packet, trusted, &mut state)?;
                state.run_success_hooks();
                Ok(())
            }
        }
    }

    /// Resolves certificate requests until one lands on a trust anchor or
    /// a verified certificate, accumulating the chain in `state`.
    fn build_chain(
        &mut self,
        mut request: CertificateRequest,
        state: &mut ValidationState,
    ) -> Result<CertificateV2, ValidationError> {
        loop {
            if let Some(trusted) = self.storage.find_trusted_certificate(&request.interest) {
                return Ok(trusted);
            }
            if state.depth() >= self.max_depth {
                return Err(ValidationError::new(
                    ValidationErrorCode::ExceededDepthLimit,
                    format!("no trust anchor within {} certificates", self.max_depth),
                ));
            }
            let certificate = match self.storage.find_unverified_certificate(&request.interest) {
                Some(certificate) => certificate,
                None => {
                    let data = self.fetcher.fetch(&mut request).map_err(|error| {
                        ValidationError::new(
                            ValidationErrorCode::CannotRetrieveCertificate,
                            error.to_string(),
                        )
                    })?;
                    let certificate = CertificateV2::from_data(data).map_err(|error| {
                        ValidationError::new(
                            ValidationErrorCode::MalformedCertificate,
                            error.to_string(),
                        )
                    })?;
                    self.storage.cache_unverified_certificate(certificate.clone());
                    certificate
                }
            };
            if !certificate.is_valid_at(self.storage.now_ms()) {
                return Err(ValidationError::new(
                    ValidationErrorCode::ExpiredCertificate,
                    format!("certificate {}", certificate.name()),
                ));
            }
            state.add_certificate(certificate.clone())?;
            match self.policy.check_data_policy(certificate.as_data(), state)? {
                PolicyAction::Fetch(next) => request = next,
                PolicyAction::Bypass => {
                    return Err(ValidationError::new(
                        ValidationErrorCode::PolicyError,
                        format!("policy bypassed certificate {}", certificate.name()),
                    ))
                }
            }
        }
    }

    /// Walks the chain from the trust anchor back toward the packet,
    /// verifying each signature with its parent's public key. On success
    /// the chain moves into the verified cache.
    fn verify_chain(
        &mut self,
        packet: PacketRef<'_>,
        trusted: CertificateV2,
        state: &mut ValidationState,
    ) -> Result<(), ValidationError> {
        let mut signer = trusted;
        for index in (0..state.chain().len()).rev() {
            let certificate = state.chain()[index].clone();
            if !self.verify_data_signature(certificate.as_data(), signer.public_key())? {
                // Everything from the packet's signer up to here never
                // verified; drop it from the chain.
                state.drop_unverified(index + 1);
                return Err(ValidationError::new(
                    ValidationErrorCode::InvalidSignature,
                    format!("certificate {}", certificate.name()),
                ));
            }
            signer = certificate;
        }
        let packet_verified = match packet {
            PacketRef::Data(data) => self.verify_data_signature(data, signer.public_key())?,
            PacketRef::Interest(interest) => {
                self.verify_interest_signature(interest, signer.public_key())?
            }
        };
        if !packet_verified {
            return Err(ValidationError::new(
                ValidationErrorCode::InvalidSignature,
                "packet signature did not verify".to_string(),
            ));
        }
        for certificate in state.take_chain() {
            self.storage.cache_verified_certificate(certificate);
        }
        Ok(())
    }

    fn verify_data_signature(
        &self,
        data: &Data,
        public_key_bits: &[u8],
    ) -> Result<bool, ValidationError> {
        let wire = data.wire_encode().map_err(|error| {
            ValidationError::new(ValidationErrorCode::ImplementationError, error.to_string())
        })?;
        Ok(self.verify_signature(data.signature(), wire.signed_portion(), public_key_bits))
    }

    fn verify_interest_signature(
        &self,
        interest: &Interest,
        public_key_bits: &[u8],
    ) -> Result<bool, ValidationError> {
        let signature = extract_interest_signature(interest).map_err(|error| {
            ValidationError::new(ValidationErrorCode::NoSignature, error.to_string())
        })?;
        let wire = interest.wire_encode().map_err(|error| {
            ValidationError::new(ValidationErrorCode::ImplementationError, error.to_string())
        })?;
        Ok(self.verify_signature(&signature, wire.signed_portion(), public_key_bits))
    }

    fn verify_signature(
        &self,
        signature: &Signature,
        signed_portion: &[u8],
        public_key_bits: &[u8],
    ) -> bool {
        match signature {
            Signature::DigestSha256 { signature } => {
                let digest: [u8; 32] = Sha256::digest(signed_portion).into();
                signature.as_ref() == digest
            }
            other => self.verifier.verify(other, signed_portion, public_key_bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::policy::{
        CommandInterestOptions, ValidationPolicyAcceptAll, ValidationPolicyCommandInterest,
        ValidationPolicySimpleHierarchy,
    };
    use crate::security::testing::{
        issue_child_certificate, key_chain_with_identity, mock_public_key_bits, MockVerifier,
    };
    use crate::security::CommandInterestSigner;
    use crate::security::KeyChain;
    use crate::types::ValidityPeriod;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    /// Serves certificates from a map keyed by name prefix, recording every
    /// request.
    struct StaticFetcher {
        certificates: HashMap<Name, Data>,
        requests: Rc<RefCell<Vec<Name>>>,
    }

    impl StaticFetcher {
        fn new(certificates: Vec<CertificateV2>) -> Self {
            Self {
                certificates: certificates
                    .into_iter()
                    .map(|c| (c.name().clone(), c.as_data().clone()))
                    .collect(),
                requests: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn requests(&self) -> Rc<RefCell<Vec<Name>>> {
            self.requests.clone()
        }
    }

    impl CertificateFetcher for StaticFetcher {
        fn fetch(&mut self, request: &mut CertificateRequest) -> Result<Data, FetchError> {
            let prefix = request.interest.name().clone();
            self.requests.borrow_mut().push(prefix.clone());
            self.certificates
                .iter()
                .find(|(name, _)| prefix.is_prefix_of(name))
                .map(|(_, data)| data.clone())
                .ok_or(FetchError::Timeout { name: prefix })
        }
    }

    fn hierarchy_validator() -> (Validator, Data, Rc<RefCell<Vec<Name>>>) {
        // Anchor /A signs a certificate for /A/S, which signs the data.
        let (mut key_chain, anchor_certificate_name) = key_chain_with_identity("/A");
        let anchor = key_chain
            .pib()
            .get_certificate(&anchor_certificate_name)
            .unwrap();
        let anchor_key = anchor.key_name();
        let child = issue_child_certificate(&mut key_chain, &anchor_key, "/A/S");

        let mut data = Data::new(name("/A/S/D"));
        data.set_content(b"payload".to_vec());
        key_chain.sign_data(&mut data, &child.key_name()).unwrap();

        let fetcher = StaticFetcher::new(vec![child]);
        let requests = fetcher.requests();
        let mut validator = Validator::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            Box::new(fetcher),
            Box::new(MockVerifier),
        );
        validator
            .storage_mut()
            .trust_anchors_mut()
            .insert("anchors", anchor)
            .unwrap();
        (validator, data, requests)
    }

    #[test]
    fn hierarchy_chain_validates_and_caches() {
        let (mut validator, data, requests) = hierarchy_validator();
        let succeeded = Cell::new(false);
        validator.validate_data(
            &data,
            |_| succeeded.set(true),
            |_, error| panic!("unexpected failure: {error}"),
        );
        assert!(succeeded.get());
        assert_eq!(1, requests.borrow().len());

        // The intermediate certificate is now in the verified cache, so a
        // second validation needs no fetch.
        let succeeded = Cell::new(false);
        validator.validate_data(
            &data,
            |_| succeeded.set(true),
            |_, error| panic!("unexpected failure: {error}"),
        );
        assert!(succeeded.get());
        assert_eq!(1, requests.borrow().len());
    }

    #[test]
    fn hierarchy_rejects_a_cross_signed_packet() {
        let (mut validator, _, _) = hierarchy_validator();
        // Signed under /A/S but named outside that subtree.
        let (mut other_chain, other_certificate) = key_chain_with_identity("/B");
        let mut data = Data::new(name("/elsewhere/D"));
        other_chain.sign_data(&mut data, &other_certificate).unwrap();

        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::PolicyError, code.get());
    }

    #[test]
    fn tampered_content_fails_with_invalid_signature() {
        let (mut validator, mut data, _) = hierarchy_validator();
        data.set_content(b"tampered".to_vec());
        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::InvalidSignature, code.get());
    }

    #[test]
    fn no_anchor_means_cannot_retrieve() {
        let (mut key_chain, certificate_name) = key_chain_with_identity("/L");
        let mut data = Data::new(name("/L/D"));
        key_chain.sign_data(&mut data, &certificate_name).unwrap();

        let mut validator = Validator::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            Box::new(StaticFetcher::new(Vec::new())),
            Box::new(MockVerifier),
        );
        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::CannotRetrieveCertificate, code.get());
    }

    #[test]
    fn certificate_loops_are_detected() {
        // Two keys of one identity whose certificates sign each other,
        // reachable only through the unverified cache; no anchor covers
        // them.
        let (mut key_chain, _) = key_chain_with_identity("/elsewhere");
        let key1 = name("/loop/KEY/k1");
        let key2 = name("/loop/KEY/k2");
        key_chain.pib_mut().add_key(&name("/loop"), &key1, mock_public_key_bits(&key1));
        key_chain.pib_mut().add_key(&name("/loop"), &key2, mock_public_key_bits(&key2));
        let now = crate::clock::now_ms();
        let validity = ValidityPeriod::new(now - 1000, now + 3_600_000);
        let certificate1 = key_chain.issue_certificate(&key1, "c", &key2, validity).unwrap();
        let certificate2 = key_chain.issue_certificate(&key2, "c", &key1, validity).unwrap();

        let mut data = Data::new(name("/loop/D"));
        key_chain.sign_data(&mut data, &key2).unwrap();

        let mut validator = Validator::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            Box::new(StaticFetcher::new(Vec::new())),
            Box::new(MockVerifier),
        );
        validator.storage_mut().cache_unverified_certificate(certificate1);
        validator.storage_mut().cache_unverified_certificate(certificate2);

        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::LoopDetected, code.get());
    }

    /// Responds to every request with a fresh certificate signed by yet
    /// another key, so the chain never terminates.
    struct InfiniteChainFetcher {
        count: Rc<Cell<usize>>,
        key_chain: KeyChain,
    }

    impl CertificateFetcher for InfiniteChainFetcher {
        fn fetch(&mut self, request: &mut CertificateRequest) -> Result<Data, FetchError> {
            let index = self.count.get();
            self.count.set(index + 1);
            let requested = CertificateV2::extract_key_name_from_cert_name(request.interest.name())
                .map_err(|error| FetchError::Failed { message: error.to_string() })?;
            let identity = requested.get_prefix(-2);
            // Sign the requested key with yet another sibling key, so each
            // certificate points one step further and the chain never
            // reaches an anchor.
            let mut next_key = identity.clone();
            next_key.append_str("KEY");
            next_key.append_str(&format!("chain{index}"));
            let pib = self.key_chain.pib_mut();
            pib.add_key(&identity, &next_key, mock_public_key_bits(&next_key));
            pib.add_key(&identity, &requested, mock_public_key_bits(&requested));
            let now = crate::clock::now_ms();
            let certificate = self
                .key_chain
                .issue_certificate(
                    &requested,
                    "chain",
                    &next_key,
                    ValidityPeriod::new(now - 1000, now + 3_600_000),
                )
                .map_err(|error| FetchError::Failed { message: error.to_string() })?;
            Ok(certificate.into_data())
        }
    }

    #[test]
    fn unbounded_chains_hit_the_depth_limit() {
        let (mut key_chain, certificate_name) = key_chain_with_identity("/deep");
        let mut data = Data::new(name("/deep/D"));
        key_chain.sign_data(&mut data, &certificate_name).unwrap();

        let count = Rc::new(Cell::new(0));
        let fetcher = InfiniteChainFetcher {
            count: count.clone(),
            key_chain: crate::security::testing::key_chain(),
        };
        let mut validator = Validator::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            Box::new(fetcher),
            Box::new(MockVerifier),
        );
        validator.set_max_depth(4);

        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::ExceededDepthLimit, code.get());
        assert_eq!(4, count.get());
    }

    #[test]
    fn expired_certificates_are_rejected() {
        let (mut key_chain, anchor_certificate_name) = key_chain_with_identity("/E");
        let anchor = key_chain
            .pib()
            .get_certificate(&anchor_certificate_name)
            .unwrap();
        let anchor_key = anchor.key_name();

        // A child certificate that expired an hour ago.
        let identity = name("/E/S");
        let mut child_key = identity.clone();
        child_key.append_str("KEY");
        child_key.append_str("k1");
        key_chain
            .pib_mut()
            .add_key(&identity, &child_key, mock_public_key_bits(&child_key));
        let now = crate::clock::now_ms();
        let expired = key_chain
            .issue_certificate(
                &child_key,
                "old",
                &anchor_key,
                ValidityPeriod::new(now - 7_200_000, now - 3_600_000),
            )
            .unwrap();

        let mut data = Data::new(name("/E/S/D"));
        key_chain.sign_data(&mut data, &child_key).unwrap();

        let mut validator = Validator::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            Box::new(StaticFetcher::new(vec![expired])),
            Box::new(MockVerifier),
        );
        validator
            .storage_mut()
            .trust_anchors_mut()
            .insert("anchors", anchor)
            .unwrap();

        let code = Cell::new(ValidationErrorCode::NoError);
        validator.validate_data(
            &data,
            |_| panic!("must not validate"),
            |_, error| code.set(error.code()),
        );
        assert_eq!(ValidationErrorCode::ExpiredCertificate, code.get());
    }

    mod fetcher_from_network {
        use super::*;
        use crate::transport::Transport;
        use crate::types::{LpPacket, NetworkNack};
        use crate::wire::{TlvWireFormat, WireFormat};
        use std::collections::VecDeque;

        /// Answers every sent Interest through `respond`, feeding the reply
        /// back on the next receive.
        struct ResponderTransport {
            respond: Box<dyn FnMut(&Interest) -> Option<Vec<u8>>>,
            queue: VecDeque<Vec<u8>>,
        }

        impl Transport for ResponderTransport {
            fn connect(&mut self) -> std::io::Result<()> {
                Ok(())
            }

            fn is_local(&self) -> bool {
                true
            }

            fn send(&mut self, wire: &[u8]) -> std::io::Result<()> {
                if let Ok(interest) = TlvWireFormat.decode_interest(wire) {
                    if let Some(reply) = (self.respond)(&interest) {
                        self.queue.push_back(reply);
                    } else {
                        // Refuse: wrap the exact interest in a Nack frame.
                        let mut lp = LpPacket::new();
                        lp.set_fragment(wire.to_vec());
                        lp.set_nack(NetworkNack::new(NackReason::NoRoute));
                        let frame = TlvWireFormat.encode_lp_packet(&lp).unwrap();
                        self.queue.push_back(frame.to_vec());
                    }
                }
                Ok(())
            }

            fn receive(&mut self) -> std::io::Result<Vec<Vec<u8>>> {
                Ok(self.queue.drain(..).collect())
            }

            fn close(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        fn face(respond: impl FnMut(&Interest) -> Option<Vec<u8>> + 'static) -> Rc<RefCell<Node>> {
            Rc::new(RefCell::new(Node::new(Box::new(ResponderTransport {
                respond: Box::new(respond),
                queue: VecDeque::new(),
            }))))
        }

        #[test]
        fn fetches_a_certificate_through_the_face() {
            let certificate = crate::security::testing::self_signed_certificate("/net/id");
            let wire = certificate.as_data().wire_encode().unwrap();
            let key_name = certificate.key_name();
            let mut fetcher = CertificateFetcherFromNetwork::new(face(move |interest| {
                interest
                    .name()
                    .is_prefix_of(&wire_name(&wire))
                    .then(|| wire.as_ref().to_vec())
            }));
            let mut request = CertificateRequest::new(Interest::new(key_name.clone()));
            let data = fetcher.fetch(&mut request).unwrap();
            assert!(key_name.is_prefix_of(data.name()));
        }

        fn wire_name(wire: &crate::types::SignedBlob) -> Name {
            TlvWireFormat.decode_data(wire.as_ref()).unwrap().name().clone()
        }

        #[test]
        fn nacks_consume_the_retry_budget() {
            let sends = Rc::new(Cell::new(0u32));
            let sends_in_responder = sends.clone();
            let mut fetcher = CertificateFetcherFromNetwork::new(face(move |_| {
                sends_in_responder.set(sends_in_responder.get() + 1);
                None
            }));
            let mut request = CertificateRequest::new(Interest::new(name("/nowhere/KEY/k")));
            let error = fetcher.fetch(&mut request).unwrap_err();
            assert!(matches!(error, FetchError::Nacked { reason: NackReason::NoRoute, .. }));
            // The initial expression plus the default retries.
            assert_eq!(1 + CertificateRequest::DEFAULT_RETRIES, sends.get());
        }
    }

    #[test]
    fn accept_all_bypasses_signature_checks() {
        let mut validator = Validator::new(
            Box::new(ValidationPolicyAcceptAll::new()),
            Box::new(StaticFetcher::new(Vec::new())),
            Box::new(MockVerifier),
        );
        // Unsigned data still passes.
        let data = Data::new(name("/anything"));
        let succeeded = Cell::new(false);
        validator.validate_data(
            &data,
            |_| succeeded.set(true),
            |_, error| panic!("unexpected failure: {error}"),
        );
        assert!(succeeded.get());
    }

    fn command_interest_validator(anchor: CertificateV2) -> Validator {
        let policy = ValidationPolicyCommandInterest::new(
            Box::new(ValidationPolicySimpleHierarchy::new()),
            CommandInterestOptions::default(),
        );
        let mut validator = Validator::new(
            Box::new(policy),
            Box::new(StaticFetcher::new(Vec::new())),
            Box::new(MockVerifier),
        );
        validator
            .storage_mut()
            .trust_anchors_mut()
            .insert("anchors", anchor)
            .unwrap();
        validator
    }

    fn signed_command(
        signer: &mut CommandInterestSigner,
        key_chain: &mut KeyChain,
        certificate_name: &Name,
    ) -> Interest {
        let mut interest = Interest::new(name("/C/app/cmd"));
        signer.sign(&mut interest, key_chain, certificate_name).unwrap();
        interest
    }

    fn outcome(validator: &mut Validator, interest: &Interest) -> Result<(), ValidationErrorCode> {
        let failure = Cell::new(None);
        let success = Cell::new(false);
        validator.validate_interest(
            interest,
            |_| success.set(true),
            |_, error| failure.set(Some(error.code())),
        );
        match failure.get() {
            Some(code) => Err(code),
            None => {
                assert!(success.get());
                Ok(())
            }
        }
    }

    #[test]
    fn command_interest_timestamps_must_advance() {
        let (mut key_chain, anchor_certificate_name) = key_chain_with_identity("/C");
        let anchor = key_chain
            .pib()
            .get_certificate(&anchor_certificate_name)
            .unwrap();
        let mut validator = command_interest_validator(anchor);
        let mut signer = CommandInterestSigner::new();

        // Two commands in order validate; replaying the first fails on
        // the timestamp, not the signature.
        let first = signed_command(&mut signer, &mut key_chain, &anchor_certificate_name);
        let second = signed_command(&mut signer, &mut key_chain, &anchor_certificate_name);
        assert_eq!(Ok(()), outcome(&mut validator, &first));
        assert_eq!(Ok(()), outcome(&mut validator, &second));
        assert_eq!(Err(ValidationErrorCode::PolicyError), outcome(&mut validator, &first));

        // A third command, issued later, still validates.
        let third = signed_command(&mut signer, &mut key_chain, &anchor_certificate_name);
        assert_eq!(Ok(()), outcome(&mut validator, &third));
    }

    #[test]
    fn rejected_commands_do_not_advance_the_timestamp_record() {
        let (mut key_chain, anchor_certificate_name) = key_chain_with_identity("/C");
        let anchor = key_chain
            .pib()
            .get_certificate(&anchor_certificate_name)
            .unwrap();
        let mut validator = command_interest_validator(anchor);

        let mut signer = CommandInterestSigner::new();
        let first = signed_command(&mut signer, &mut key_chain, &anchor_certificate_name);
        assert_eq!(Ok(()), outcome(&mut validator, &first));

        // A command stamped 100 s ahead whose signature bits are zeroed:
        // the timestamp check passes but the chain fails, so its timestamp
        // must not be recorded.
        let mut ahead_signer = CommandInterestSigner::new();
        ahead_signer.set_now_offset_ms(100_000);
        let mut forged =
            signed_command(&mut ahead_signer, &mut key_chain, &anchor_certificate_name);
        let mut zeroed_value = vec![0x17, 0x20];
        zeroed_value.extend_from_slice(&[0u8; 32]);
        let mut forged_name = forged.name().get_prefix(-1);
        forged_name.append(crate::types::Component::new(zeroed_value));
        forged.set_name(forged_name);
        assert_eq!(
            Err(ValidationErrorCode::InvalidSignature),
            outcome(&mut validator, &forged)
        );

        // A genuine command stamped 50 s ahead sits between the recorded
        // timestamp and the forged one; it only validates if the forgery
        // left the record untouched.
        let mut later_signer = CommandInterestSigner::new();
        later_signer.set_now_offset_ms(50_000);
        let third = signed_command(&mut later_signer, &mut key_chain, &anchor_certificate_name);
        assert_eq!(Ok(()), outcome(&mut validator, &third));
    }
}
