//! Validation settings.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use samltrust_crypto::{DigestAlgorithm, SignatureAlgorithm};
use serde::{Deserialize, Serialize};

use crate::conditions::{ValidationContext, DEFAULT_CLOCK_SKEW_SECS};
use crate::error::{SamlError, SamlResult};
use crate::xml::CanonicalizationAlgorithm;

/// Validation policy.
///
/// Defaults allow RSA and ECDSA with SHA-2 only; SHA-1 and HMAC have to be
/// opted into (HMAC cannot be).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Allowed clock skew in seconds.
    pub clock_skew_secs: u32,

    /// Signature algorithms accepted in `ds:SignatureMethod`.
    pub allowed_signature_algorithms: BTreeSet<SignatureAlgorithm>,

    /// Digest algorithms accepted in `ds:DigestMethod`.
    pub allowed_digest_algorithms: BTreeSet<DigestAlgorithm>,

    /// Canonicalization algorithms accepted for `SignedInfo` and reference
    /// transforms.
    pub allowed_canonicalization_algorithms: BTreeSet<CanonicalizationAlgorithm>,

    /// Require the assertion itself to be signed, even inside a signed
    /// response.
    pub require_signed_assertions: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            allowed_signature_algorithms: BTreeSet::from([
                SignatureAlgorithm::RsaSha256,
                SignatureAlgorithm::RsaSha384,
                SignatureAlgorithm::RsaSha512,
                SignatureAlgorithm::EcdsaSha256,
                SignatureAlgorithm::EcdsaSha384,
                SignatureAlgorithm::EcdsaSha512,
            ]),
            allowed_digest_algorithms: BTreeSet::from([
                DigestAlgorithm::Sha256,
                DigestAlgorithm::Sha384,
                DigestAlgorithm::Sha512,
            ]),
            allowed_canonicalization_algorithms: BTreeSet::from([
                CanonicalizationAlgorithm::ExclusiveC14N,
                CanonicalizationAlgorithm::C14N,
            ]),
            require_signed_assertions: false,
        }
    }
}

impl ValidationSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] for malformed JSON or an unusable
    /// policy (see [`Self::validate`]).
    pub fn from_json(json: &str) -> SamlResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the policy can ever accept anything.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if an allowlist is empty or a symmetric
    /// signature algorithm is allowed.
    pub fn validate(&self) -> SamlResult<()> {
        if self.allowed_signature_algorithms.is_empty()
            || self.allowed_digest_algorithms.is_empty()
            || self.allowed_canonicalization_algorithms.is_empty()
        {
            return Err(SamlError::Config("algorithm allowlists must not be empty".to_string()));
        }

        if let Some(symmetric) = self
            .allowed_signature_algorithms
            .iter()
            .find(|alg| alg.is_symmetric())
        {
            return Err(SamlError::Config(format!(
                "symmetric signature algorithm {} cannot be allowed",
                symmetric.xml_dsig_uri()
            )));
        }
        Ok(())
    }

    /// Returns the clock skew as a duration.
    pub fn clock_skew(&self) -> Duration {
        Duration::seconds(i64::from(self.clock_skew_secs))
    }

    /// Builds a validation context with the configured clock skew.
    pub fn context(&self, now: DateTime<Utc>, expected_recipient: impl Into<String>) -> ValidationContext {
        ValidationContext::new(now, expected_recipient).with_clock_skew(self.clock_skew())
    }

    /// Adds a signature algorithm to the allowlist.
    #[must_use]
    pub fn allow_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.allowed_signature_algorithms.insert(algorithm);
        self
    }

    /// Adds a digest algorithm to the allowlist.
    #[must_use]
    pub fn allow_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.allowed_digest_algorithms.insert(algorithm);
        self
    }

    /// Sets whether assertions must carry their own signature.
    #[must_use]
    pub const fn with_require_signed_assertions(mut self, required: bool) -> Self {
        self.require_signed_assertions = required;
        self
    }
}
