//! Certificate storage for the validator: anchors plus two caches.

use crate::security::{CertificateCacheV2, CertificateV2, TrustAnchorContainer};
use crate::types::{Interest, MillisecondsSince1970, Name};

/// The certificates a validator works from: trust anchors, a cache of
/// certificates whose chains verified, and a short-lived cache of fetched
/// but unverified certificates.
#[derive(Debug)]
pub struct CertificateStorage {
    trust_anchors: TrustAnchorContainer,
    verified_cache: CertificateCacheV2,
    unverified_cache: CertificateCacheV2,
}

impl Default for CertificateStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateStorage {
    /// The default lifetime bound of the unverified cache: five minutes.
    pub const UNVERIFIED_CACHE_LIFETIME: u64 = 300_000;

    pub fn new() -> Self {
        Self {
            trust_anchors: TrustAnchorContainer::new(),
            verified_cache: CertificateCacheV2::new(CertificateCacheV2::DEFAULT_MAX_LIFETIME),
            unverified_cache: CertificateCacheV2::new(Self::UNVERIFIED_CACHE_LIFETIME),
        }
    }

    /// A certificate matching `interest` from the trust anchors or the
    /// verified cache, if any.
    pub fn find_trusted_certificate(&mut self, interest: &Interest) -> Option<CertificateV2> {
        self.trust_anchors
            .find_by_interest(interest)
            .or_else(|| self.verified_cache.find_by_interest(interest))
    }

    /// A certificate matching `interest` from the unverified cache, if
    /// any.
    pub fn find_unverified_certificate(&mut self, interest: &Interest) -> Option<CertificateV2> {
        self.unverified_cache.find_by_interest(interest)
    }

    /// True if any store holds a certificate under `prefix`.
    pub fn is_certificate_known(&mut self, prefix: &Name) -> bool {
        self.trust_anchors.find_by_key_name(prefix).is_some()
            || self.verified_cache.find_by_prefix(prefix).is_some()
            || self.unverified_cache.find_by_prefix(prefix).is_some()
    }

    pub fn cache_unverified_certificate(&mut self, certificate: CertificateV2) {
        self.unverified_cache.insert(certificate);
    }

    pub fn cache_verified_certificate(&mut self, certificate: CertificateV2) {
        self.verified_cache.insert(certificate);
    }

    pub fn trust_anchors(&self) -> &TrustAnchorContainer {
        &self.trust_anchors
    }

    pub fn trust_anchors_mut(&mut self) -> &mut TrustAnchorContainer {
        &mut self.trust_anchors
    }

    pub fn verified_cache_mut(&mut self) -> &mut CertificateCacheV2 {
        &mut self.verified_cache
    }

    pub fn unverified_cache_mut(&mut self) -> &mut CertificateCacheV2 {
        &mut self.unverified_cache
    }

    /// The current time as the caches see it.
    pub(crate) fn now_ms(&self) -> MillisecondsSince1970 {
        self.verified_cache.now_ms()
    }

    /// Shifts the clock of both caches. Test support.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.verified_cache.set_now_offset_ms(offset_ms);
        self.unverified_cache.set_now_offset_ms(offset_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::testing::self_signed_certificate;

    #[test]
    fn is_certificate_known_spans_all_stores() {
        let mut storage = CertificateStorage::new();
        let anchored = self_signed_certificate("/anchor/id");
        let verified = self_signed_certificate("/verified/id");
        let unverified = self_signed_certificate("/unverified/id");

        storage.trust_anchors_mut().insert("g", anchored.clone()).unwrap();
        storage.cache_verified_certificate(verified.clone());
        storage.cache_unverified_certificate(unverified.clone());

        for certificate in [&anchored, &verified, &unverified] {
            assert!(storage.is_certificate_known(&certificate.key_name()));
        }
        assert!(!storage.is_certificate_known(&Name::from_uri("/nobody").unwrap()));

        // Anchors and the verified cache feed trusted lookups; the
        // unverified cache does not.
        let interest = Interest::new(unverified.key_name());
        assert!(storage.find_trusted_certificate(&interest).is_none());
        assert!(storage.find_unverified_certificate(&interest).is_some());
    }
}
