//! XML Signature support for SAML.
//!
//! Enveloped XML-DSig signatures only: a `ds:Signature` is accepted as the
//! signature of an element when it is a direct child of that element and its
//! single `Reference` points back at the element's `ID`. Signatures found
//! anywhere else are treated as wrapping attempts.
//!
//! # Algorithms
//!
//! Verification supports RSA PKCS#1 v1.5 and ECDSA with SHA-1/256/384/512;
//! which of them are accepted is decided by [`ValidationSettings`]. Signing
//! supports the SHA-2 variants only.
//!
//! [`ValidationSettings`]: crate::config::ValidationSettings

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use base64::Engine;
use samltrust_crypto::SignatureAlgorithm;
use tracing::{debug, warn};

use crate::error::{RejectionReason, SamlError, SamlResult};
use crate::types::XMLDSIG_NS;
use crate::xml::{CanonicalizationAlgorithm, XmlElement, XmlNode};

/// A `ds:Reference` inside `SignedInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureReference {
    /// The `URI` attribute, if present.
    pub uri: Option<String>,
    /// Transform algorithm URIs, in order.
    pub transforms: Vec<String>,
    /// The `DigestMethod` algorithm URI.
    pub digest_method: String,
    /// The base64 digest value, whitespace removed.
    pub digest_value: String,
}

/// A parsed `ds:Signature` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSignature {
    /// The `SignatureMethod` algorithm URI.
    pub signature_method: String,
    /// The `CanonicalizationMethod` algorithm URI.
    pub canonicalization_method: String,
    /// All references in `SignedInfo`.
    pub references: Vec<SignatureReference>,
    /// The base64 signature value, whitespace removed.
    pub signature_value: String,
    /// DER certificates from `KeyInfo/X509Data`.
    pub certificates: Vec<Vec<u8>>,
    signed_info: XmlElement,
}

impl XmlSignature {
    /// Reads a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] if `SignedInfo`, one of its
    /// algorithm attributes, or `SignatureValue` is missing.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        if !element.is(XMLDSIG_NS, "Signature") {
            return Err(SamlError::InvalidElement(format!(
                "expected ds:Signature, found {}",
                element.qualified_name()
            )));
        }

        let signed_info = dsig_child(element, "SignedInfo")?;
        let canonicalization_method = algorithm(dsig_child(signed_info, "CanonicalizationMethod")?)?;
        let signature_method = algorithm(dsig_child(signed_info, "SignatureMethod")?)?;

        let references = signed_info
            .children_named(XMLDSIG_NS, "Reference")
            .map(|reference| -> SamlResult<SignatureReference> {
                let transforms = reference
                    .child(XMLDSIG_NS, "Transforms")
                    .map(|transforms| {
                        transforms
                            .children_named(XMLDSIG_NS, "Transform")
                            .map(algorithm)
                            .collect::<SamlResult<Vec<_>>>()
                    })
                    .transpose()?
                    .unwrap_or_default();

                Ok(SignatureReference {
                    uri: reference.attribute("URI").map(str::to_string),
                    transforms,
                    digest_method: algorithm(dsig_child(reference, "DigestMethod")?)?,
                    digest_value: strip_whitespace(&dsig_child(reference, "DigestValue")?.text()),
                })
            })
            .collect::<SamlResult<Vec<_>>>()?;

        let signature_value = strip_whitespace(&dsig_child(element, "SignatureValue")?.text());

        let certificates = element
            .child(XMLDSIG_NS, "KeyInfo")
            .into_iter()
            .flat_map(|key_info| key_info.children_named(XMLDSIG_NS, "X509Data"))
            .flat_map(|data| data.children_named(XMLDSIG_NS, "X509Certificate"))
            .filter_map(|certificate| {
                let text = strip_whitespace(&certificate.text());
                match base64::engine::general_purpose::STANDARD.decode(&text) {
                    Ok(der) => Some(der),
                    Err(e) => {
                        debug!("Ignoring undecodable embedded certificate: {e}");
                        None
                    }
                }
            })
            .collect();

        Ok(Self {
            signature_method,
            canonicalization_method,
            references,
            signature_value,
            certificates,
            signed_info: signed_info.clone(),
        })
    }

    /// Returns the `SignedInfo` element.
    pub const fn signed_info(&self) -> &XmlElement {
        &self.signed_info
    }
}

/// An element together with its enveloped signature.
#[derive(Debug, Clone)]
pub struct SignedDocument<'a> {
    document: &'a XmlElement,
    element: &'a XmlElement,
    signature_position: usize,
    signature: XmlSignature,
}

impl<'a> SignedDocument<'a> {
    /// Locates the signature of `element` within `document`.
    ///
    /// Returns `Ok(None)` if `element` is unsigned.
    ///
    /// # Errors
    ///
    /// - `Rejected(SignatureLocalityViolation)` if `element` has more than
    ///   one direct-child signature, or none while a signature elsewhere in
    ///   `document` references it.
    /// - A structural error if the signature is malformed.
    pub fn locate(document: &'a XmlElement, element: &'a XmlElement) -> SamlResult<Option<Self>> {
        let mut direct = element.nodes().iter().enumerate().filter_map(|(position, node)| match node {
            XmlNode::Element(child) if child.is(XMLDSIG_NS, "Signature") => Some((position, child)),
            _ => None,
        });

        match (direct.next(), direct.next()) {
            (Some((signature_position, signature)), None) => Ok(Some(Self {
                document,
                element,
                signature_position,
                signature: XmlSignature::from_element(signature)?,
            })),
            (Some(_), Some(_)) => {
                warn!("{} carries more than one signature", element.qualified_name());
                Err(RejectionReason::SignatureLocalityViolation.into())
            }
            (None, _) => {
                if let Some(id) = element.attribute("ID") {
                    let target = format!("#{id}");
                    let displaced = document
                        .descendants()
                        .into_iter()
                        .filter(|candidate| candidate.is(XMLDSIG_NS, "Signature"))
                        .any(|signature| references_uri(signature, &target));
                    if displaced {
                        warn!("Signature referencing {target} is not a child of the element it signs");
                        return Err(RejectionReason::SignatureLocalityViolation.into());
                    }
                }
                Ok(None)
            }
        }
    }

    /// Returns the signed element.
    pub const fn element(&self) -> &'a XmlElement {
        self.element
    }

    /// Returns the whole document the element belongs to.
    pub const fn document(&self) -> &'a XmlElement {
        self.document
    }

    /// Returns the parsed signature.
    pub const fn signature(&self) -> &XmlSignature {
        &self.signature
    }

    /// Returns the `ID` of the signed element.
    pub fn signed_id(&self) -> Option<&'a str> {
        self.element.attribute("ID")
    }

    /// Returns the signed element with its signature removed, as the
    /// enveloped-signature transform sees it.
    pub(crate) fn enveloped_element(&self) -> XmlElement {
        self.element.without_node(self.signature_position)
    }
}

/// Configuration for signature creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// Canonicalization of `SignedInfo` and of the signed element.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to include the X.509 certificate in `KeyInfo`.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self::with_algorithm(SignatureAlgorithm::RsaSha256)
    }
}

impl SignatureConfig {
    /// Creates a configuration for the given algorithm with exclusive
    /// canonicalization.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }

    /// Sets the canonicalization algorithm.
    #[must_use]
    pub const fn with_canonicalization(mut self, canonicalization: CanonicalizationAlgorithm) -> Self {
        self.canonicalization = canonicalization;
        self
    }
}

fn dsig_child<'e>(element: &'e XmlElement, local_name: &str) -> SamlResult<&'e XmlElement> {
    element
        .child(XMLDSIG_NS, local_name)
        .ok_or_else(|| SamlError::MissingElement(format!("ds:{local_name}")))
}

fn algorithm(element: &XmlElement) -> SamlResult<String> {
    element
        .attribute("Algorithm")
        .map(str::to_string)
        .ok_or_else(|| SamlError::MissingElement(format!("{}@Algorithm", element.qualified_name())))
}

fn references_uri(signature: &XmlElement, uri: &str) -> bool {
    signature
        .child(XMLDSIG_NS, "SignedInfo")
        .into_iter()
        .flat_map(|signed_info| signed_info.children_named(XMLDSIG_NS, "Reference"))
        .any(|reference| reference.attribute("URI") == Some(uri))
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
