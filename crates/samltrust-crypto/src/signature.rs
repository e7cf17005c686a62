//! Signature error type and the verification/signing seams.

use thiserror::Error;

use crate::algorithm::SignatureAlgorithm;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Invalid or unparseable certificate.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Algorithm not supported for this key.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// Something that can verify a signature produced by its private counterpart.
pub trait SignatureVerifier {
    /// Verifies `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Verification`] if the signature does not
    /// match, or another variant if the key cannot be used with `algorithm`.
    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError>;
}

/// Something that can produce signatures.
pub trait SignatureProvider: Send + Sync {
    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot sign with `algorithm`.
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>, SignatureError>;
}
