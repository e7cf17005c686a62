//! SAML 2.0 trust validation.
//!
//! This crate decides whether an assertion received from a remote identity
//! provider can be trusted:
//!
//! - **Key resolution** - which keys may speak for the issuer ([`keys`])
//! - **XML signature** - enveloped XML-DSig verification with wrapping
//!   protection ([`signature`])
//! - **Conditions** - validity window, audience and subject confirmation
//!   ([`conditions`])
//! - **Orchestration** - one typed accept/reject decision ([`validation`])
//!
//! # Architecture
//!
//! - [`xml`] - Owned, namespace-resolved element tree and canonicalization
//! - [`types`] - The assertion and response claims that are evaluated
//! - [`config`] - Algorithm allowlists and clock skew
//! - [`error`] - The rejection taxonomy and the fatal error channel
//!
//! # Example
//!
//! ```rust,ignore
//! use samltrust::{IdentityProviderConfig, ValidationOrchestrator, ValidationSettings};
//!
//! let settings = ValidationSettings::default();
//! let idp = IdentityProviderConfig::new("https://idp.example.com")
//!     .with_certificate_file("/etc/saml/idp.pem");
//! let context = settings.context(chrono::Utc::now(), "https://sp.example.com/acs")
//!     .with_audience("https://sp.example.com");
//!
//! let result = ValidationOrchestrator::new(settings).validate(&xml, &idp, &context)?;
//! ```
//!
//! # Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod conditions;
pub mod config;
pub mod error;
pub mod keys;
pub mod signature;
pub mod types;
pub mod validation;
pub mod xml;

pub use conditions::{ConditionsValidator, ValidationContext, DEFAULT_CLOCK_SKEW_SECS};
pub use config::ValidationSettings;
pub use error::{RejectionReason, SamlError, SamlResult};
pub use keys::{
    CertificateProvider, IdentityProviderConfig, IdentityProviderSettings, KeyCandidateSet,
    KeyFormat, KeyLoader, KeyMaterial, KeySettings, KeySource, KeyUsage, RequestedUsage,
};
pub use signature::{SignatureConfig, SignatureValidator, SignedDocument, XmlSignature, XmlSigner};
pub use types::*;
pub use validation::{AcceptedAssertion, ValidationOrchestrator, ValidationResult};
pub use xml::{CanonicalizationAlgorithm, XmlElement};
