//! Candidate key resolution.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{RejectionReason, SamlResult};

use super::material::{KeyMaterial, KeySource, KeyUsage, RequestedUsage};

/// Where the keys of a remote entity can be found.
///
/// Implemented by whichever metadata or configuration layer is in use.
pub trait CertificateProvider {
    /// Pre-parsed keys, typically from metadata `KeyDescriptor`s.
    fn keys(&self) -> Option<&[KeyMaterial]>;

    /// A PEM certificate given inline.
    fn certificate_data(&self) -> Option<&str>;

    /// Path of a PEM certificate file.
    fn certificate_file(&self) -> Option<&Path>;
}

/// An ordered set of candidate keys.
///
/// Signature verification tries the keys in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCandidateSet {
    keys: Vec<KeyMaterial>,
}

impl KeyCandidateSet {
    /// Creates a set with the given trial order.
    #[must_use]
    pub const fn new(keys: Vec<KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Returns true if there is no candidate.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the number of candidates.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns the candidates in trial order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyMaterial> {
        self.keys.iter()
    }

    /// Returns the first candidate.
    pub fn first(&self) -> Option<&KeyMaterial> {
        self.keys.first()
    }
}

impl<'a> IntoIterator for &'a KeyCandidateSet {
    type Item = &'a KeyMaterial;
    type IntoIter = std::slice::Iter<'a, KeyMaterial>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl From<Vec<KeyMaterial>> for KeyCandidateSet {
    fn from(keys: Vec<KeyMaterial>) -> Self {
        Self::new(keys)
    }
}

/// Resolves candidate keys from a [`CertificateProvider`].
///
/// Sources are consulted in order and never merged:
///
/// 1. `keys()`, filtered by usage
/// 2. `certificate_data()`
/// 3. `certificate_file()`
///
/// The first source yielding a candidate wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyLoader;

impl KeyLoader {
    /// Loads the candidate keys for `usage`.
    ///
    /// # Errors
    ///
    /// - `Rejected(InvalidCertificateStructure)` if configured certificate
    ///   text is malformed, whatever `required` says.
    /// - `Rejected(NoKeysFound)` if nothing was found and `required` is set.
    /// - [`SamlError::Io`](crate::SamlError::Io) if the certificate file
    ///   cannot be read.
    pub fn load<P>(provider: &P, usage: RequestedUsage, required: bool) -> SamlResult<KeyCandidateSet>
    where
        P: CertificateProvider + ?Sized,
    {
        if let Some(keys) = provider.keys() {
            let matching: Vec<KeyMaterial> =
                keys.iter().filter(|key| key.satisfies(usage)).cloned().collect();
            if !matching.is_empty() {
                debug!("Using {} of {} configured key(s)", matching.len(), keys.len());
                return Ok(KeyCandidateSet::new(matching));
            }
            debug!("None of {} configured key(s) can be used for {usage:?}", keys.len());
        }

        if let Some(data) = provider.certificate_data() {
            let key = KeyMaterial::from_pem(data, KeyUsage::Unspecified, KeySource::CertificateData)?;
            debug!("Using certificate data, key {}", key.id());
            return Ok(KeyCandidateSet::new(vec![key]));
        }

        if let Some(path) = provider.certificate_file() {
            let pem = fs::read_to_string(path)?;
            let key = KeyMaterial::from_pem(&pem, KeyUsage::Unspecified, KeySource::CertificateFile)?;
            debug!("Using certificate file {}, key {}", path.display(), key.id());
            return Ok(KeyCandidateSet::new(vec![key]));
        }

        if required {
            warn!("No key available for {usage:?}");
            return Err(RejectionReason::NoKeysFound.into());
        }
        Ok(KeyCandidateSet::default())
    }
}
