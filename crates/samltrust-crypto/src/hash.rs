//! Digest and fingerprint functions.
//!
//! SHA-1 is only reachable through [`DigestAlgorithm::Sha1`]; whether it may
//! be used is decided by the caller's policy, not here.

use aws_lc_rs::{constant_time, digest};

use crate::algorithm::DigestAlgorithm;

/// Computes a digest of the input data.
#[must_use]
pub fn hash(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    let alg = match algorithm {
        DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        DigestAlgorithm::Sha256 => &digest::SHA256,
        DigestAlgorithm::Sha384 => &digest::SHA384,
        DigestAlgorithm::Sha512 => &digest::SHA512,
    };

    digest::digest(alg, data).as_ref().to_vec()
}

/// Computes the lowercase hex fingerprint of DER-encoded data.
#[must_use]
pub fn fingerprint(algorithm: DigestAlgorithm, der: &[u8]) -> String {
    hex::encode(hash(algorithm, der))
}

/// Normalizes a textual fingerprint: separators (`:`, whitespace) are
/// removed and hex digits lowercased.
///
/// Returns `None` unless the result is valid hex of a SHA-1 or SHA-256
/// digest length.
#[must_use]
pub fn normalize_fingerprint(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let bytes = hex::decode(&cleaned).ok()?;
    fingerprint_algorithm(bytes.len()).map(|_| cleaned)
}

/// Returns the digest algorithm whose output has the given length, for the
/// lengths accepted as certificate fingerprints.
#[must_use]
pub const fn fingerprint_algorithm(digest_len: usize) -> Option<DigestAlgorithm> {
    match digest_len {
        20 => Some(DigestAlgorithm::Sha1),
        32 => Some(DigestAlgorithm::Sha256),
        _ => None,
    }
}

/// Compares two byte strings in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    constant_time::verify_slices_are_equal(a, b).is_ok()
}
