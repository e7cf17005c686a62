//! # samltrust-crypto
//!
//! Cryptographic primitives for SAML trust validation, built on aws-lc-rs.
//!
//! ## Scope
//!
//! - Digests and certificate fingerprints
//! - Public-key extraction from X.509 certificates
//! - RSA PKCS#1 v1.5 and ECDSA signature verification (and signing for
//!   issuers and test fixtures)
//!
//! Which algorithms may be used is policy, and policy lives in `samltrust`.
//! This crate only answers "is this signature valid for this key".

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod keys;
pub mod signature;

pub use algorithm::{DigestAlgorithm, SignatureAlgorithm};
pub use hash::{constant_time_eq, fingerprint, hash, normalize_fingerprint};
pub use keys::{EcCurve, PublicKey, SigningKey};
pub use signature::{SignatureError, SignatureProvider, SignatureVerifier};
