//! SAML trust error types.
//!
//! Two channels are kept apart:
//!
//! - [`RejectionReason`] is the closed set of reasons an assertion is turned
//!   down. Callers branch on it; the text is for humans only.
//! - [`SamlError`] carries everything else (unparseable XML, missing
//!   elements, I/O, configuration). A rejection travels through `?` as
//!   [`SamlError::Rejected`] and is unwrapped again by the orchestrator.

use serde::Serialize;
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// Why an assertion was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Certificate text is not a well-formed PEM/base64 X.509 certificate.
    #[error("invalid certificate structure")]
    InvalidCertificateStructure,

    /// No candidate key is available for the requested usage.
    #[error("no keys found")]
    NoKeysFound,

    /// No candidate key verifies the signature, or the digest does not match.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The signature is not placed on, or does not reference, the node it signs.
    #[error("signature locality violation")]
    SignatureLocalityViolation,

    /// A signature, digest or canonicalization algorithm is not allowed.
    #[error("algorithm not allowed")]
    AlgorithmNotAllowed,

    /// The assertion is not valid yet.
    #[error("assertion not yet valid")]
    NotYetValid,

    /// The assertion or its subject confirmation has expired.
    #[error("assertion expired")]
    Expired,

    /// No audience restriction is satisfied.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// The recipient or destination is not the expected endpoint.
    #[error("recipient mismatch")]
    RecipientMismatch,

    /// The message answers a different request.
    #[error("correlation mismatch")]
    CorrelationMismatch,
}

impl RejectionReason {
    /// Returns a stable machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCertificateStructure => "invalid_certificate_structure",
            Self::NoKeysFound => "no_keys_found",
            Self::SignatureVerificationFailed => "signature_verification_failed",
            Self::SignatureLocalityViolation => "signature_locality_violation",
            Self::AlgorithmNotAllowed => "algorithm_not_allowed",
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::AudienceMismatch => "audience_mismatch",
            Self::RecipientMismatch => "recipient_mismatch",
            Self::CorrelationMismatch => "correlation_mismatch",
        }
    }
}

/// SAML trust errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Element present but malformed.
    #[error("invalid element: {0}")]
    InvalidElement(String),

    /// Reading a certificate file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The assertion was rejected.
    #[error("rejected: {0}")]
    Rejected(#[from] RejectionReason),
}

impl SamlError {
    /// Returns the rejection reason, if this error is a rejection.
    #[must_use]
    pub const fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<serde_json::Error> for SamlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<samltrust_crypto::SignatureError> for SamlError {
    fn from(err: samltrust_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}
