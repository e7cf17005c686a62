//! XML Signature validation.
//!
//! Structure and algorithm checks run first. Only a signature that passes
//! them has its digest recomputed and its value checked against the
//! candidate keys.

use std::collections::BTreeSet;

use base64::Engine;
use samltrust_crypto::{constant_time_eq, hash, DigestAlgorithm, SignatureAlgorithm, SignatureVerifier};
use tracing::{debug, warn};

use crate::config::ValidationSettings;
use crate::error::RejectionReason;
use crate::keys::{KeyCandidateSet, KeyMaterial};
use crate::types::transforms;
use crate::xml::CanonicalizationAlgorithm;

use super::SignedDocument;

/// Verifies enveloped signatures against an ordered set of candidate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureValidator {
    signature_algorithms: BTreeSet<SignatureAlgorithm>,
    digest_algorithms: BTreeSet<DigestAlgorithm>,
    canonicalization_algorithms: BTreeSet<CanonicalizationAlgorithm>,
}

impl Default for SignatureValidator {
    fn default() -> Self {
        Self::new(&ValidationSettings::default())
    }
}

/// What the structural checks resolved.
struct CheckedSignature {
    algorithm: SignatureAlgorithm,
    canonicalization: CanonicalizationAlgorithm,
    digest: DigestAlgorithm,
    reference_canonicalization: CanonicalizationAlgorithm,
    enveloped: bool,
}

impl SignatureValidator {
    /// Creates a validator enforcing the allowlists in `settings`.
    ///
    /// Symmetric algorithms are dropped from the signature allowlist even if
    /// `settings` names them: no candidate key holds a shared secret.
    #[must_use]
    pub fn new(settings: &ValidationSettings) -> Self {
        let signature_algorithms = settings
            .allowed_signature_algorithms
            .iter()
            .copied()
            .filter(|alg| {
                if alg.is_symmetric() {
                    warn!("Ignoring symmetric signature algorithm {}", alg.xml_dsig_uri());
                }
                !alg.is_symmetric()
            })
            .collect();

        Self {
            signature_algorithms,
            digest_algorithms: settings.allowed_digest_algorithms.clone(),
            canonicalization_algorithms: settings.allowed_canonicalization_algorithms.clone(),
        }
    }

    /// Verifies `signed` and returns the candidate key that produced it.
    ///
    /// Candidates are tried in list order; the first one that verifies wins.
    ///
    /// # Errors
    ///
    /// - `SignatureLocalityViolation` if the reference does not point at the
    ///   signed element, or its `ID` is not unique in the document
    /// - `AlgorithmNotAllowed` for a signature, digest, canonicalization or
    ///   transform algorithm outside the allowlists
    /// - `NoKeysFound` if `keys` is empty
    /// - `SignatureVerificationFailed` if the digest does not match or no
    ///   candidate verifies the signature value
    pub fn verify<'k>(
        &self,
        signed: &SignedDocument<'_>,
        keys: &'k KeyCandidateSet,
    ) -> Result<&'k KeyMaterial, RejectionReason> {
        check_reference(signed)?;
        let checked = self.check_algorithms(signed)?;

        if keys.is_empty() {
            warn!("No candidate key to verify the signature with");
            return Err(RejectionReason::NoKeysFound);
        }

        verify_digest(signed, &checked)?;

        let signature = signed.signature();
        let signature_value = base64::engine::general_purpose::STANDARD
            .decode(&signature.signature_value)
            .map_err(|e| {
                debug!("Undecodable SignatureValue: {e}");
                RejectionReason::SignatureVerificationFailed
            })?;
        let signed_info = signature.signed_info().canonicalize(checked.canonicalization);

        for key in keys {
            match key.verification_key(&signature.certificates) {
                Ok(Some(public_key)) => {
                    match public_key.verify(checked.algorithm, signed_info.as_bytes(), &signature_value) {
                        Ok(()) => {
                            debug!("Signature verified by key {}", key.id());
                            return Ok(key);
                        }
                        Err(e) => debug!("Key {} did not verify: {e}", key.id()),
                    }
                }
                Ok(None) => debug!("Key {} matches no embedded certificate", key.id()),
                Err(e) => debug!("Key {} is unusable: {e}", key.id()),
            }
        }

        warn!("Signature did not verify with any of {} candidate key(s)", keys.len());
        Err(RejectionReason::SignatureVerificationFailed)
    }

    fn check_algorithms(&self, signed: &SignedDocument<'_>) -> Result<CheckedSignature, RejectionReason> {
        let signature = signed.signature();

        let algorithm = SignatureAlgorithm::from_xml_dsig_uri(&signature.signature_method)
            .filter(|alg| self.signature_algorithms.contains(alg))
            .ok_or_else(|| not_allowed("signature", &signature.signature_method))?;

        let canonicalization = self.canonicalization(&signature.canonicalization_method)?;

        let reference = &signature.references[0];
        let digest = DigestAlgorithm::from_xml_dsig_uri(&reference.digest_method)
            .filter(|alg| self.digest_algorithms.contains(alg))
            .ok_or_else(|| not_allowed("digest", &reference.digest_method))?;

        let mut enveloped = false;
        let mut reference_canonicalization = None;
        for transform in &reference.transforms {
            if transform == transforms::ENVELOPED_SIGNATURE && !enveloped {
                enveloped = true;
            } else if reference_canonicalization.is_none() {
                reference_canonicalization = Some(self.canonicalization(transform)?);
            } else {
                return Err(not_allowed("transform", transform));
            }
        }

        // Without an explicit transform the node set is serialized with
        // inclusive C14N.
        let reference_canonicalization = match reference_canonicalization {
            Some(c14n) => c14n,
            None => self.canonicalization(CanonicalizationAlgorithm::C14N.uri())?,
        };

        Ok(CheckedSignature {
            algorithm,
            canonicalization,
            digest,
            reference_canonicalization,
            enveloped,
        })
    }

    fn canonicalization(&self, uri: &str) -> Result<CanonicalizationAlgorithm, RejectionReason> {
        CanonicalizationAlgorithm::from_uri(uri)
            .filter(|alg| self.canonicalization_algorithms.contains(alg))
            .ok_or_else(|| not_allowed("canonicalization", uri))
    }
}

fn check_reference(signed: &SignedDocument<'_>) -> Result<(), RejectionReason> {
    let references = &signed.signature().references;
    let [reference] = references.as_slice() else {
        warn!("Signature has {} references, expected exactly one", references.len());
        return Err(RejectionReason::SignatureLocalityViolation);
    };

    let id = signed.signed_id();
    let points_at_element = match (reference.uri.as_deref(), id) {
        (Some(""), _) => std::ptr::eq(signed.element(), signed.document()),
        (Some(uri), Some(id)) => uri.strip_prefix('#') == Some(id),
        _ => false,
    };
    if !points_at_element {
        warn!(
            "Signature reference {:?} does not point at the signed {}",
            reference.uri,
            signed.element().qualified_name()
        );
        return Err(RejectionReason::SignatureLocalityViolation);
    }

    if let Some(id) = id {
        let count = signed
            .document()
            .descendants()
            .into_iter()
            .filter(|element| element.attribute("ID") == Some(id))
            .count();
        if count != 1 {
            warn!("ID {id} appears {count} times in the document");
            return Err(RejectionReason::SignatureLocalityViolation);
        }
    }

    Ok(())
}

fn verify_digest(signed: &SignedDocument<'_>, checked: &CheckedSignature) -> Result<(), RejectionReason> {
    let reference = &signed.signature().references[0];

    let expected = base64::engine::general_purpose::STANDARD
        .decode(&reference.digest_value)
        .map_err(|e| {
            debug!("Undecodable DigestValue: {e}");
            RejectionReason::SignatureVerificationFailed
        })?;

    // Same-document references never carry comments.
    let c14n = checked.reference_canonicalization.without_comments();
    let canonical = if checked.enveloped {
        signed.enveloped_element().canonicalize(c14n)
    } else {
        signed.element().canonicalize(c14n)
    };

    if !constant_time_eq(&hash(checked.digest, canonical.as_bytes()), &expected) {
        warn!("Digest mismatch for {}", signed.element().qualified_name());
        return Err(RejectionReason::SignatureVerificationFailed);
    }
    Ok(())
}

fn not_allowed(kind: &str, uri: &str) -> RejectionReason {
    warn!("{kind} algorithm {uri} is not allowed");
    RejectionReason::AlgorithmNotAllowed
}
