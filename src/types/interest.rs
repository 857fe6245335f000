//! The Interest packet: a request for named data.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::EncodeError;
use crate::types::{
    Blob, ChangeCounter, Data, DelegationSet, Exclude, KeyLocator, Milliseconds, Name, Snapshot,
    WireCache,
};

static DEFAULT_CAN_BE_PREFIX: AtomicBool = AtomicBool::new(true);

/// Sets the CanBePrefix value applied to newly constructed Interests.
///
/// Applications that want exact-match Interests by default should call this
/// once at startup, before creating Interests.
pub fn set_default_can_be_prefix(can_be_prefix: bool) {
    DEFAULT_CAN_BE_PREFIX.store(can_be_prefix, Ordering::Relaxed);
}

/// The CanBePrefix value applied to newly constructed Interests.
pub fn default_can_be_prefix() -> bool {
    DEFAULT_CAN_BE_PREFIX.load(Ordering::Relaxed)
}

/// A request for a Data packet matching a name, with optional selectors.
#[derive(Clone, Debug)]
pub struct Interest {
    name: Name,
    min_suffix_components: Option<u32>,
    max_suffix_components: Option<u32>,
    key_locator: KeyLocator,
    exclude: Exclude,
    child_selector: Option<u32>,
    must_be_fresh: bool,
    interest_lifetime: Option<Milliseconds>,
    nonce: Blob,
    forwarding_hint: DelegationSet,
    application_parameters: Blob,
    hop_limit: Option<u8>,
    change: ChangeCounter,
    name_snapshot: Snapshot,
    exclude_snapshot: Snapshot,
    forwarding_hint_snapshot: Snapshot,
    nonce_set_at: Cell<u64>,
    wire: WireCache,
}

impl Interest {
    /// Creates an Interest for `name`, applying the process-wide default
    /// CanBePrefix flag.
    pub fn new(name: Name) -> Self {
        let mut interest = Self {
            name,
            min_suffix_components: None,
            max_suffix_components: None,
            key_locator: KeyLocator::None,
            exclude: Exclude::new(),
            child_selector: None,
            must_be_fresh: true,
            interest_lifetime: None,
            nonce: Blob::default(),
            forwarding_hint: DelegationSet::new(),
            application_parameters: Blob::default(),
            hop_limit: None,
            change: ChangeCounter::default(),
            name_snapshot: Snapshot::default(),
            exclude_snapshot: Snapshot::default(),
            forwarding_hint_snapshot: Snapshot::default(),
            nonce_set_at: Cell::new(0),
            wire: WireCache::default(),
        };
        interest.set_can_be_prefix(default_can_be_prefix());
        interest
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn name_mut(&mut self) -> &mut Name {
        &mut self.name
    }

    pub fn set_name(&mut self, name: Name) -> &mut Self {
        self.name = name;
        self.change.bump();
        self
    }

    pub fn min_suffix_components(&self) -> Option<u32> {
        self.min_suffix_components
    }

    pub fn set_min_suffix_components(&mut self, count: impl Into<Option<u32>>) -> &mut Self {
        self.min_suffix_components = count.into();
        self.change.bump();
        self
    }

    pub fn max_suffix_components(&self) -> Option<u32> {
        self.max_suffix_components
    }

    pub fn set_max_suffix_components(&mut self, count: impl Into<Option<u32>>) -> &mut Self {
        self.max_suffix_components = count.into();
        self.change.bump();
        self
    }

    /// True unless this Interest requires an exact match, i.e. unless
    /// MaxSuffixComponents is 1.
    pub fn can_be_prefix(&self) -> bool {
        self.max_suffix_components != Some(1)
    }

    pub fn set_can_be_prefix(&mut self, can_be_prefix: bool) -> &mut Self {
        self.max_suffix_components = if can_be_prefix { None } else { Some(1) };
        self.change.bump();
        self
    }

    /// The publisher-key selector: a Data only matches when its signature's
    /// key locator equals this one.
    pub fn key_locator(&self) -> &KeyLocator {
        &self.key_locator
    }

    pub fn set_key_locator(&mut self, key_locator: KeyLocator) -> &mut Self {
        self.key_locator = key_locator;
        self.change.bump();
        self
    }

    pub fn exclude(&self) -> &Exclude {
        &self.exclude
    }

    pub fn exclude_mut(&mut self) -> &mut Exclude {
        &mut self.exclude
    }

    pub fn set_exclude(&mut self, exclude: Exclude) -> &mut Self {
        self.exclude = exclude;
        self.change.bump();
        self
    }

    pub fn child_selector(&self) -> Option<u32> {
        self.child_selector
    }

    pub fn set_child_selector(&mut self, selector: impl Into<Option<u32>>) -> &mut Self {
        self.child_selector = selector.into();
        self.change.bump();
        self
    }

    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }

    pub fn set_must_be_fresh(&mut self, must_be_fresh: bool) -> &mut Self {
        self.must_be_fresh = must_be_fresh;
        self.change.bump();
        self
    }

    pub fn interest_lifetime(&self) -> Option<Milliseconds> {
        self.interest_lifetime
    }

    pub fn set_interest_lifetime(&mut self, lifetime: impl Into<Option<Milliseconds>>) -> &mut Self {
        self.interest_lifetime = lifetime.into();
        self.change.bump();
        self
    }

    /// The nonce, or an empty blob if the Interest changed since the nonce
    /// was set. A fresh random nonce is stamped at encode time when empty.
    pub fn nonce(&self) -> Blob {
        if self.nonce_set_at.get() == self.change_count() {
            self.nonce.clone()
        } else {
            Blob::default()
        }
    }

    pub fn set_nonce(&mut self, nonce: impl Into<Blob>) -> &mut Self {
        self.nonce = nonce.into();
        self.change.bump();
        self.nonce_set_at.set(self.change_count());
        self
    }

    pub fn forwarding_hint(&self) -> &DelegationSet {
        &self.forwarding_hint
    }

    pub fn forwarding_hint_mut(&mut self) -> &mut DelegationSet {
        &mut self.forwarding_hint
    }

    pub fn set_forwarding_hint(&mut self, hint: DelegationSet) -> &mut Self {
        self.forwarding_hint = hint;
        self.change.bump();
        self
    }

    pub fn application_parameters(&self) -> &Blob {
        &self.application_parameters
    }

    pub fn set_application_parameters(&mut self, parameters: impl Into<Blob>) -> &mut Self {
        self.application_parameters = parameters.into();
        self.change.bump();
        self
    }

    /// Computes the SHA-256 digest of the application parameters and appends
    /// it to the name as a ParametersSha256Digest component.
    pub fn append_parameters_digest(&mut self) -> &mut Self {
        use sha2::{Digest, Sha256};
        use crate::types::Component;
        let digest: [u8; 32] = Sha256::digest(self.application_parameters.as_ref()).into();
        self.name
            .append(Component::from_digest(Component::PARAMETERS_SHA256_DIGEST, digest));
        self
    }

    pub fn hop_limit(&self) -> Option<u8> {
        self.hop_limit
    }

    pub fn set_hop_limit(&mut self, hop_limit: impl Into<Option<u8>>) -> &mut Self {
        self.hop_limit = hop_limit.into();
        self.change.bump();
        self
    }

    /// True if `name` could be the name of a Data satisfying this Interest:
    /// it starts with the Interest name and the suffix length satisfies the
    /// suffix-count selectors.
    pub fn matches_name(&self, name: &Name) -> bool {
        if !self.name.is_prefix_of(name) {
            return false;
        }
        let suffix = (name.len() - self.name.len()) as u32;
        if let Some(min) = self.min_suffix_components {
            if suffix < min {
                return false;
            }
        }
        if let Some(max) = self.max_suffix_components {
            if suffix > max {
                return false;
            }
        }
        true
    }

    /// True if `data` satisfies this Interest: its full name (with the
    /// implicit digest appended) matches, the component following the
    /// Interest name is not excluded, and the publisher-key selector agrees
    /// with the Data's signature.
    ///
    /// MustBeFresh and ChildSelector are forwarder concerns and are not
    /// enforced here.
    pub fn matches_data(&self, data: &Data) -> Result<bool, EncodeError> {
        let full_name = data.full_name()?;
        if !self.matches_name(&full_name) {
            return Ok(false);
        }
        if !self.exclude.is_empty() {
            if let Some(component) = full_name.get(self.name.len() as isize) {
                if self.exclude.matches(component) {
                    return Ok(false);
                }
            }
        }
        if !self.key_locator.is_none() && data.signature().key_locator() != &self.key_locator {
            return Ok(false);
        }
        Ok(true)
    }

    /// The aggregated change count, folding in mutations made directly to
    /// the name, exclude, and forwarding hint.
    pub(crate) fn change_count(&self) -> u64 {
        let mut changed = self.name_snapshot.check_changed(self.name.change_count());
        changed |= self.exclude_snapshot.check_changed(self.exclude.change_count());
        changed |= self
            .forwarding_hint_snapshot
            .check_changed(self.forwarding_hint.change_count());
        if changed {
            self.change.bump();
        }
        self.change.get()
    }

    pub(crate) fn wire_cache(&self) -> &WireCache {
        &self.wire
    }

    /// Marks the current nonce as in sync with the packet state. Used after
    /// decoding, where the received nonce belongs to the received fields.
    pub(crate) fn confirm_nonce(&self) {
        self.nonce_set_at.set(self.change_count());
    }
}

impl PartialEq for Interest {
    /// Equality over the selector and payload fields. The nonce is
    /// ephemeral per-send state and is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.min_suffix_components == other.min_suffix_components
            && self.max_suffix_components == other.max_suffix_components
            && self.key_locator == other.key_locator
            && self.exclude == other.exclude
            && self.child_selector == other.child_selector
            && self.must_be_fresh == other.must_be_fresh
            && self.interest_lifetime == other.interest_lifetime
            && self.forwarding_hint == other.forwarding_hint
            && self.application_parameters == other.application_parameters
            && self.hop_limit == other.hop_limit
    }
}

impl Eq for Interest {}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut separator = '?';
        let mut param = |f: &mut fmt::Formatter<'_>, text: String| -> fmt::Result {
            let result = write!(f, "{separator}{text}");
            separator = '&';
            result
        };
        if let Some(min) = self.min_suffix_components {
            param(f, format!("ndn.MinSuffixComponents={min}"))?;
        }
        if let Some(max) = self.max_suffix_components {
            param(f, format!("ndn.MaxSuffixComponents={max}"))?;
        }
        if let Some(selector) = self.child_selector {
            param(f, format!("ndn.ChildSelector={selector}"))?;
        }
        if self.must_be_fresh {
            param(f, "ndn.MustBeFresh=true".to_string())?;
        }
        if let Some(lifetime) = self.interest_lifetime {
            param(f, format!("ndn.InterestLifetime={lifetime}"))?;
        }
        let nonce = self.nonce();
        if !nonce.is_empty() {
            param(f, format!("ndn.Nonce={}", hex::encode(nonce.as_ref())))?;
        }
        if !self.exclude.is_empty() {
            param(f, format!("ndn.Exclude={}", self.exclude))?;
        }
        Ok(())
    }
}
