//! Trust anchors: certificates trusted a priori, in named groups.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use base64::Engine;
use tracing::warn;

use crate::clock;
use crate::error::InvalidArgument;
use crate::security::CertificateV2;
use crate::types::{Interest, Milliseconds, Name};

/// A named set of anchors: either fixed insertions or the contents of a
/// filesystem path refreshed on a period.
#[derive(Debug)]
pub enum TrustAnchorGroup {
    /// Anchors inserted explicitly.
    Static { certificate_names: Vec<Name> },
    /// Anchors loaded from a certificate file or a directory of them.
    Dynamic {
        path: PathBuf,
        refresh_period: Milliseconds,
        next_refresh_ms: u64,
        file_mtimes: BTreeMap<PathBuf, SystemTime>,
        certificate_names: Vec<Name>,
    },
}

/// Holds every trust-anchor group and an aggregate index over their
/// certificates. Dynamic groups are refreshed before each lookup when
/// their period has elapsed: changed, added, or removed files replace the
/// group's set.
#[derive(Debug, Default)]
pub struct TrustAnchorContainer {
    groups: BTreeMap<String, TrustAnchorGroup>,
    anchors: BTreeMap<Name, CertificateV2>,
}

impl TrustAnchorContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `certificate` into the static group `group_id`, creating
    /// the group if needed.
    pub fn insert(
        &mut self,
        group_id: &str,
        certificate: CertificateV2,
    ) -> Result<(), InvalidArgument> {
        let group = self
            .groups
            .entry(group_id.to_string())
            .or_insert(TrustAnchorGroup::Static { certificate_names: Vec::new() });
        let TrustAnchorGroup::Static { certificate_names } = group else {
            return Err(InvalidArgument::new(format!(
                "trust anchor group \"{group_id}\" is dynamic"
            )));
        };
        let name = certificate.name().clone();
        if !certificate_names.contains(&name) {
            certificate_names.push(name.clone());
        }
        self.anchors.insert(name, certificate);
        Ok(())
    }

    /// Creates the dynamic group `group_id` watching `path` (a certificate
    /// file or a directory of them), reloading every `refresh_period`
    /// milliseconds.
    pub fn insert_dynamic(
        &mut self,
        group_id: &str,
        path: impl Into<PathBuf>,
        refresh_period: Milliseconds,
    ) -> Result<(), InvalidArgument> {
        if refresh_period == 0 {
            return Err(InvalidArgument::new("refresh period must be positive"));
        }
        if self.groups.contains_key(group_id) {
            return Err(InvalidArgument::new(format!(
                "trust anchor group \"{group_id}\" already exists"
            )));
        }
        self.groups.insert(
            group_id.to_string(),
            TrustAnchorGroup::Dynamic {
                path: path.into(),
                refresh_period,
                next_refresh_ms: 0,
                file_mtimes: BTreeMap::new(),
                certificate_names: Vec::new(),
            },
        );
        self.refresh();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.anchors.clear();
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// The anchor whose name extends `key_name`, if any. Dynamic groups
    /// are refreshed first.
    pub fn find_by_key_name(&mut self, key_name: &Name) -> Option<CertificateV2> {
        self.refresh();
        self.anchors
            .range(key_name.clone()..)
            .take_while(|(name, _)| key_name.is_prefix_of(name))
            .map(|(_, certificate)| certificate.clone())
            .next()
    }

    /// The first anchor matching `interest` by prefix, honoring its
    /// Exclude but not ChildSelector. Dynamic groups are refreshed first.
    pub fn find_by_interest(&mut self, interest: &Interest) -> Option<CertificateV2> {
        self.refresh();
        find_in_index(&self.anchors, interest)
    }

    /// Reloads every dynamic group whose refresh period has elapsed.
    pub fn refresh(&mut self) {
        let now = clock::now_ms();
        for group in self.groups.values_mut() {
            let TrustAnchorGroup::Dynamic {
                path,
                refresh_period,
                next_refresh_ms,
                file_mtimes,
                certificate_names,
            } = group
            else {
                continue;
            };
            if now < *next_refresh_ms {
                continue;
            }
            *next_refresh_ms = now + *refresh_period;
            let current = scan_path(path);
            if current == *file_mtimes {
                continue;
            }
            *file_mtimes = current;
            // Rebuild the group's slice of the aggregate index.
            for name in certificate_names.drain(..) {
                self.anchors.remove(&name);
            }
            for file in file_mtimes.keys() {
                match load_certificate_file(file) {
                    Ok(certificate) => {
                        let name = certificate.name().clone();
                        certificate_names.push(name.clone());
                        self.anchors.insert(name, certificate);
                    }
                    Err(error) => {
                        warn!("skipping trust anchor file {}: {error}", file.display())
                    }
                }
            }
        }
    }
}

/// The files under `path` (itself, or its direct children when it is a
/// directory) with their modification times.
fn scan_path(path: &Path) -> BTreeMap<PathBuf, SystemTime> {
    let mut files = BTreeMap::new();
    let mut push = |file: PathBuf| {
        if let Ok(metadata) = std::fs::metadata(&file) {
            if metadata.is_file() {
                let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                files.insert(file, mtime);
            }
        }
    };
    match std::fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                push(entry.path());
            }
        }
        Err(_) => push(path.to_path_buf()),
    }
    files
}

/// Reads a certificate from a file holding either a raw Data wire encoding
/// or its base64 text form.
fn load_certificate_file(path: &Path) -> Result<CertificateV2, InvalidArgument> {
    let bytes = std::fs::read(path)
        .map_err(|error| InvalidArgument::new(format!("cannot read file: {error}")))?;
    if let Ok(certificate) = CertificateV2::wire_decode(&bytes) {
        return Ok(certificate);
    }
    let text: String = bytes
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_whitespace())
        .collect();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|error| InvalidArgument::new(format!("neither TLV nor base64: {error}")))?;
    CertificateV2::wire_decode(&decoded)
        .map_err(|error| InvalidArgument::new(format!("not a certificate: {error}")))
}

/// Prefix lookup over a sorted certificate index, honoring the interest's
/// Exclude.
pub(crate) fn find_in_index(
    index: &BTreeMap<Name, CertificateV2>,
    interest: &Interest,
) -> Option<CertificateV2> {
    index
        .range(interest.name().clone()..)
        .take_while(|(name, _)| interest.name().is_prefix_of(name))
        .find(|(name, _)| {
            if interest.exclude().is_empty() || name.len() <= interest.name().len() {
                return true;
            }
            match name.get(interest.name().len() as isize) {
                Some(component) => !interest.exclude().matches(component),
                None => true,
            }
        })
        .map(|(_, certificate)| certificate.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::testing::self_signed_certificate;
    use crate::types::Exclude;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn static_group_lookup_by_key_and_interest() {
        let mut container = TrustAnchorContainer::new();
        let certificate = self_signed_certificate("/org/site");
        container.insert("group", certificate.clone()).unwrap();
        assert_eq!(1, container.len());

        let found = container.find_by_key_name(&certificate.key_name()).unwrap();
        assert_eq!(certificate.name(), found.name());
        assert!(container.find_by_key_name(&name("/org/other/KEY/x")).is_none());

        let interest = Interest::new(certificate.identity());
        assert!(container.find_by_interest(&interest).is_some());

        // Excluding the component after the interest name hides the anchor.
        let mut interest = Interest::new(certificate.identity());
        let mut exclude = Exclude::new();
        exclude.append_component(name("/KEY").get(0).unwrap().clone());
        interest.set_exclude(exclude);
        assert!(container.find_by_interest(&interest).is_none());
    }

    #[test]
    fn duplicate_dynamic_group_is_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let mut container = TrustAnchorContainer::new();
        container.insert_dynamic("g", directory.path(), 1000).unwrap();
        assert!(container.insert_dynamic("g", directory.path(), 1000).is_err());
        assert!(container.insert_dynamic("h", directory.path(), 0).is_err());
    }

    #[test]
    fn dynamic_group_tracks_directory_contents() {
        let directory = tempfile::tempdir().unwrap();
        let certificate = self_signed_certificate("/dyn/id");
        let wire = certificate.as_data().wire_encode().unwrap();
        std::fs::write(directory.path().join("anchor.cert"), wire.as_ref()).unwrap();

        let mut container = TrustAnchorContainer::new();
        container.insert_dynamic("dir", directory.path(), 1000).unwrap();
        assert!(container.find_by_key_name(&certificate.key_name()).is_some());

        // Removing the file empties the group at the next refresh. A fresh
        // container sees the change immediately since its first refresh is
        // due at once.
        std::fs::remove_file(directory.path().join("anchor.cert")).unwrap();
        let mut container = TrustAnchorContainer::new();
        container.insert_dynamic("dir", directory.path(), 1000).unwrap();
        assert!(container.find_by_key_name(&certificate.key_name()).is_none());
    }

    #[test]
    fn base64_anchor_files_load() {
        let directory = tempfile::tempdir().unwrap();
        let certificate = self_signed_certificate("/b64/id");
        let wire = certificate.as_data().wire_encode().unwrap();
        let text = base64::engine::general_purpose::STANDARD.encode(wire.as_ref());
        std::fs::write(directory.path().join("anchor.b64"), text).unwrap();

        let mut container = TrustAnchorContainer::new();
        container.insert_dynamic("dir", directory.path(), 1000).unwrap();
        assert!(container.find_by_key_name(&certificate.key_name()).is_some());
    }
}
