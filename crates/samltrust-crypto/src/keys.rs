//! Public-key extraction and asymmetric key pairs.
//!
//! XML-DSig ECDSA signatures are the raw `r || s` concatenation, so the
//! `*_FIXED` aws-lc-rs algorithms are used throughout.
//!
//! ## Supported verification combinations
//!
//! | Key            | Algorithms                         |
//! |----------------|------------------------------------|
//! | RSA (≥2048)    | RSA-SHA1, RSA-SHA256/384/512       |
//! | EC P-256       | ECDSA-SHA256                       |
//! | EC P-384       | ECDSA-SHA384                       |
//! | EC P-521       | ECDSA-SHA512                       |

use aws_lc_rs::{
    rand::SystemRandom,
    rsa::KeySize,
    signature::{
        self, EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair, RsaKeyPair, UnparsedPublicKey,
        VerificationAlgorithm,
    },
};
use x509_parser::oid_registry::{
    OID_EC_P256, OID_KEY_TYPE_EC_PUBLIC_KEY, OID_NIST_EC_P384, OID_NIST_EC_P521,
    OID_PKCS1_RSAENCRYPTION,
};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::algorithm::SignatureAlgorithm;
use crate::signature::{SignatureError, SignatureProvider, SignatureVerifier};

/// Named elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
    /// NIST P-521.
    P521,
}

impl EcCurve {
    /// Returns the curve name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Returns the ECDSA signature algorithm paired with this curve.
    #[must_use]
    pub const fn signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::P256 => SignatureAlgorithm::EcdsaSha256,
            Self::P384 => SignatureAlgorithm::EcdsaSha384,
            Self::P521 => SignatureAlgorithm::EcdsaSha512,
        }
    }

    const fn signing_algorithm(self) -> &'static EcdsaSigningAlgorithm {
        match self {
            Self::P256 => &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            Self::P384 => &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
            Self::P521 => &signature::ECDSA_P521_SHA512_FIXED_SIGNING,
        }
    }
}

/// An asymmetric public key usable for signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA public key as DER `RSAPublicKey` (PKCS#1).
    Rsa(Vec<u8>),
    /// EC public key as an uncompressed SEC1 point.
    Ec {
        /// The curve the point lies on.
        curve: EcCurve,
        /// The encoded point.
        point: Vec<u8>,
    },
}

impl PublicKey {
    /// Extracts the subject public key from a DER-encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidCertificate`] if the bytes are not a
    /// single well-formed certificate, or [`SignatureError::InvalidKey`] if
    /// its key type is other than RSA or EC on a supported curve.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, SignatureError> {
        certificate_public_key(der)
    }

    /// Returns the raw key bytes in the form handed to aws-lc-rs.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Rsa(der) => der,
            Self::Ec { point, .. } => point,
        }
    }

    fn verification_algorithm(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<&'static dyn VerificationAlgorithm, SignatureError> {
        let alg: &'static dyn VerificationAlgorithm = match (self, algorithm) {
            (Self::Rsa(_), SignatureAlgorithm::RsaSha1) => {
                &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
            }
            (Self::Rsa(_), SignatureAlgorithm::RsaSha256) => &signature::RSA_PKCS1_2048_8192_SHA256,
            (Self::Rsa(_), SignatureAlgorithm::RsaSha384) => &signature::RSA_PKCS1_2048_8192_SHA384,
            (Self::Rsa(_), SignatureAlgorithm::RsaSha512) => &signature::RSA_PKCS1_2048_8192_SHA512,
            (Self::Ec { curve: EcCurve::P256, .. }, SignatureAlgorithm::EcdsaSha256) => {
                &signature::ECDSA_P256_SHA256_FIXED
            }
            (Self::Ec { curve: EcCurve::P384, .. }, SignatureAlgorithm::EcdsaSha384) => {
                &signature::ECDSA_P384_SHA384_FIXED
            }
            (Self::Ec { curve: EcCurve::P521, .. }, SignatureAlgorithm::EcdsaSha512) => {
                &signature::ECDSA_P521_SHA512_FIXED
            }
            _ => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{} with a {} key",
                    algorithm.xml_dsig_uri(),
                    self.describe()
                )));
            }
        };
        Ok(alg)
    }

    fn describe(&self) -> String {
        match self {
            Self::Rsa(_) => "RSA".to_string(),
            Self::Ec { curve, .. } => format!("EC {}", curve.name()),
        }
    }
}

impl SignatureVerifier for PublicKey {
    fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        sig: &[u8],
    ) -> Result<(), SignatureError> {
        let verification_alg = self.verification_algorithm(algorithm)?;
        UnparsedPublicKey::new(verification_alg, self.as_bytes())
            .verify(message, sig)
            .map_err(|_| SignatureError::Verification)
    }
}

fn certificate_public_key(der: &[u8]) -> Result<PublicKey, SignatureError> {
    let (rest, cert) = X509Certificate::from_der(der)
        .map_err(|e| SignatureError::InvalidCertificate(format!("Failed to parse certificate: {e}")))?;
    if !rest.is_empty() {
        return Err(SignatureError::InvalidCertificate(
            "Trailing data after certificate".to_string(),
        ));
    }

    let spki = cert.public_key();
    let key_bytes = spki.subject_public_key.data.to_vec();

    if spki.algorithm.algorithm == OID_PKCS1_RSAENCRYPTION {
        return Ok(PublicKey::Rsa(key_bytes));
    }
    if spki.algorithm.algorithm != OID_KEY_TYPE_EC_PUBLIC_KEY {
        return Err(SignatureError::InvalidKey(format!(
            "Unsupported public key algorithm: {}",
            spki.algorithm.algorithm
        )));
    }

    let curve_oid = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.as_oid().ok())
        .ok_or_else(|| SignatureError::InvalidKey("EC key without named curve".to_string()))?;

    let curve = if curve_oid == OID_EC_P256 {
        EcCurve::P256
    } else if curve_oid == OID_NIST_EC_P384 {
        EcCurve::P384
    } else if curve_oid == OID_NIST_EC_P521 {
        EcCurve::P521
    } else {
        return Err(SignatureError::InvalidKey(format!("Unsupported EC curve: {curve_oid}")));
    };

    Ok(PublicKey::Ec {
        curve,
        point: key_bytes,
    })
}

/// A private key able to produce XML-DSig signatures.
pub enum SigningKey {
    /// RSA key pair (PKCS#1 v1.5 signatures).
    Rsa(RsaKeyPair),
    /// ECDSA key pair on a named curve.
    Ecdsa {
        /// The key pair.
        key_pair: EcdsaKeyPair,
        /// The curve.
        curve: EcCurve,
    },
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(_) => write!(f, "RSA private key"),
            Self::Ecdsa { curve, .. } => write!(f, "EC {} private key", curve.name()),
        }
    }
}

impl SigningKey {
    /// Loads an ECDSA key from PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or not on `curve`.
    pub fn ecdsa_from_pkcs8(curve: EcCurve, pkcs8_der: &[u8]) -> Result<Self, SignatureError> {
        let key_pair = EcdsaKeyPair::from_pkcs8(curve.signing_algorithm(), pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid ECDSA PKCS#8 key: {e}")))?;
        Ok(Self::Ecdsa { key_pair, curve })
    }

    /// Generates a fresh 2048-bit RSA key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate_rsa() -> Result<Self, SignatureError> {
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048)
            .map_err(|e| SignatureError::KeyGeneration(format!("RSA: {e}")))?;
        Ok(Self::Rsa(key_pair))
    }

    /// Generates a fresh ECDSA key on `curve`.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate_ecdsa(curve: EcCurve) -> Result<Self, SignatureError> {
        let key_pair = EcdsaKeyPair::generate(curve.signing_algorithm())
            .map_err(|e| SignatureError::KeyGeneration(format!("ECDSA: {e}")))?;
        Ok(Self::Ecdsa { key_pair, curve })
    }

    /// Returns the matching public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(key_pair) => PublicKey::Rsa(key_pair.public_key().as_ref().to_vec()),
            Self::Ecdsa { key_pair, curve } => PublicKey::Ec {
                curve: *curve,
                point: key_pair.public_key().as_ref().to_vec(),
            },
        }
    }

    /// Returns the strongest default algorithm for this key.
    #[must_use]
    pub const fn default_algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Rsa(_) => SignatureAlgorithm::RsaSha256,
            Self::Ecdsa { curve, .. } => curve.signature_algorithm(),
        }
    }
}

impl SignatureProvider for SigningKey {
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();
        match self {
            Self::Rsa(key_pair) => {
                let padding: &'static dyn signature::RsaEncoding = match algorithm {
                    SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
                    SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
                    SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
                    _ => {
                        return Err(SignatureError::UnsupportedAlgorithm(format!(
                            "{} not supported for RSA signing",
                            algorithm.xml_dsig_uri()
                        )));
                    }
                };
                let mut sig = vec![0u8; key_pair.public_modulus_len()];
                key_pair
                    .sign(padding, &rng, data, &mut sig)
                    .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;
                Ok(sig)
            }
            Self::Ecdsa { key_pair, curve } => {
                if algorithm != curve.signature_algorithm() {
                    return Err(SignatureError::UnsupportedAlgorithm(format!(
                        "{} not supported for an EC {} key",
                        algorithm.xml_dsig_uri(),
                        curve.name()
                    )));
                }
                let sig = key_pair
                    .sign(&rng, data)
                    .map_err(|e| SignatureError::Signing(format!("ECDSA signing failed: {e}")))?;
                Ok(sig.as_ref().to_vec())
            }
        }
    }
}
