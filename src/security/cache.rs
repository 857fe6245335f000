//! A certificate cache with bounded entry lifetimes.

use std::collections::BTreeMap;

use crate::clock;
use crate::security::anchors::find_in_index;
use crate::security::CertificateV2;
use crate::types::{Interest, Milliseconds, MillisecondsSince1970, Name};

/// Caches certificates by name, dropping each entry at
/// `min(notAfter, insertedAt + maxLifetime)`.
///
/// Expired entries are swept opportunistically: whenever a lookup happens
/// after the earliest scheduled removal.
#[derive(Debug)]
pub struct CertificateCacheV2 {
    certificates: BTreeMap<Name, Entry>,
    max_lifetime: Milliseconds,
    next_refresh_ms: MillisecondsSince1970,
    now_offset_ms: i64,
}

#[derive(Debug)]
struct Entry {
    certificate: CertificateV2,
    remove_time_ms: MillisecondsSince1970,
}

impl CertificateCacheV2 {
    /// The default bound on a cached verified certificate: one hour.
    pub const DEFAULT_MAX_LIFETIME: Milliseconds = 3_600_000;

    pub fn new(max_lifetime: Milliseconds) -> Self {
        Self {
            certificates: BTreeMap::new(),
            max_lifetime,
            next_refresh_ms: MillisecondsSince1970::MAX,
            now_offset_ms: 0,
        }
    }

    pub fn insert(&mut self, certificate: CertificateV2) {
        let now = self.now_ms();
        let remove_time_ms = certificate
            .validity_period()
            .not_after()
            .min(now.saturating_add(self.max_lifetime));
        self.next_refresh_ms = self.next_refresh_ms.min(remove_time_ms);
        self.certificates
            .insert(certificate.name().clone(), Entry { certificate, remove_time_ms });
    }

    /// The first certificate whose name extends `prefix`.
    pub fn find_by_prefix(&mut self, prefix: &Name) -> Option<CertificateV2> {
        self.refresh();
        self.certificates
            .range(prefix.clone()..)
            .take_while(|(name, _)| prefix.is_prefix_of(name))
            .map(|(_, entry)| entry.certificate.clone())
            .next()
    }

    /// The first certificate matching `interest` by prefix, honoring its
    /// Exclude but not ChildSelector.
    pub fn find_by_interest(&mut self, interest: &Interest) -> Option<CertificateV2> {
        self.refresh();
        let index: BTreeMap<Name, CertificateV2> = self
            .certificates
            .iter()
            .map(|(name, entry)| (name.clone(), entry.certificate.clone()))
            .collect();
        find_in_index(&index, interest)
    }

    pub fn remove(&mut self, certificate_name: &Name) {
        self.certificates.remove(certificate_name);
    }

    pub fn clear(&mut self) {
        self.certificates.clear();
        self.next_refresh_ms = MillisecondsSince1970::MAX;
    }

    pub fn len(&mut self) -> usize {
        self.refresh();
        self.certificates.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn contains(&mut self, certificate_name: &Name) -> bool {
        self.refresh();
        self.certificates.contains_key(certificate_name)
    }

    fn refresh(&mut self) {
        let now = self.now_ms();
        if now < self.next_refresh_ms {
            return;
        }
        self.certificates.retain(|_, entry| entry.remove_time_ms > now);
        self.next_refresh_ms = self
            .certificates
            .values()
            .map(|entry| entry.remove_time_ms)
            .min()
            .unwrap_or(MillisecondsSince1970::MAX);
    }

    pub(crate) fn now_ms(&self) -> MillisecondsSince1970 {
        clock::offset_now_ms(self.now_offset_ms)
    }

    /// Shifts this cache's clock. Test support.
    pub fn set_now_offset_ms(&mut self, offset_ms: i64) {
        self.now_offset_ms = offset_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::testing::{certificate_valid_between, self_signed_certificate};

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn entries_expire_after_the_maximum_lifetime() {
        let mut cache = CertificateCacheV2::new(CertificateCacheV2::DEFAULT_MAX_LIFETIME);
        let certificate = self_signed_certificate("/cached/id");
        cache.insert(certificate.clone());
        assert!(cache.find_by_prefix(&certificate.key_name()).is_some());

        cache.set_now_offset_ms(3_600_000 + 1000);
        assert!(cache.find_by_prefix(&certificate.key_name()).is_none());
        assert_eq!(0, cache.len());
    }

    #[test]
    fn entries_expire_at_not_after_when_sooner() {
        let now = clock::now_ms();
        let mut cache = CertificateCacheV2::new(CertificateCacheV2::DEFAULT_MAX_LIFETIME);
        let certificate = certificate_valid_between("/short/id", now - 1000, now + 10_000);
        cache.insert(certificate.clone());
        assert!(cache.contains(certificate.name()));

        cache.set_now_offset_ms(11_000);
        assert!(!cache.contains(certificate.name()));
    }

    #[test]
    fn interest_lookup_honors_prefixes() {
        let mut cache = CertificateCacheV2::new(CertificateCacheV2::DEFAULT_MAX_LIFETIME);
        let certificate = self_signed_certificate("/look/up");
        cache.insert(certificate.clone());
        assert!(cache.find_by_interest(&Interest::new(name("/look"))).is_some());
        assert!(cache.find_by_interest(&Interest::new(name("/other"))).is_none());
    }
}
