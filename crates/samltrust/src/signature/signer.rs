//! XML Signature creation.
//!
//! Produces enveloped signatures in the shape [`SignatureValidator`]
//! accepts: one reference to the element's `ID`, the enveloped-signature
//! transform followed by the configured canonicalization, and the
//! `ds:Signature` placed right after the element's `saml:Issuer`.
//!
//! [`SignatureValidator`]: super::SignatureValidator

use base64::Engine;
use quick_xml::escape::escape;
use samltrust_crypto::{hash, SignatureProvider, SigningKey};
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::types::{transforms, SAML_NS, XMLDSIG_NS};
use crate::xml::{XmlElement, XmlNode};

use super::SignatureConfig;

/// XML document signer.
#[derive(Debug)]
pub struct XmlSigner {
    key: SigningKey,
    certificate_der: Option<Vec<u8>>,
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a signer using the key's default algorithm.
    pub fn new(key: SigningKey, certificate_der: Option<Vec<u8>>) -> Self {
        let config = SignatureConfig::with_algorithm(key.default_algorithm());
        Self {
            key,
            certificate_der,
            config,
        }
    }

    /// Sets the signature configuration.
    #[must_use]
    pub const fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the signature configuration.
    pub const fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Signs the element whose `ID` is `reference_id` and returns the
    /// document serialized with inclusive C14N.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the XML does not parse or has no
    /// element with that ID, and [`SamlError::Crypto`] if signing fails.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let mut root = XmlElement::parse(xml)?;
        let target = root
            .element_with_id_mut(reference_id)
            .ok_or_else(|| SamlError::MissingElement(format!("element with ID '{reference_id}'")))?;

        let digest_algorithm = self.config.algorithm.digest();
        let digest = hash(
            digest_algorithm,
            target.canonicalize(self.config.canonicalization).as_bytes(),
        );

        let template = format!(
            concat!(
                r#"<ds:Signature xmlns:ds="{ns}"><ds:SignedInfo>"#,
                r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
                r#"<ds:SignatureMethod Algorithm="{method}"/>"#,
                r##"<ds:Reference URI="#{id}"><ds:Transforms>"##,
                r#"<ds:Transform Algorithm="{enveloped}"/>"#,
                r#"<ds:Transform Algorithm="{c14n}"/>"#,
                r#"</ds:Transforms><ds:DigestMethod Algorithm="{digest_method}"/>"#,
                r#"<ds:DigestValue>{digest}</ds:DigestValue></ds:Reference></ds:SignedInfo>"#,
                r#"<ds:SignatureValue/>{key_info}</ds:Signature>"#,
            ),
            ns = XMLDSIG_NS,
            c14n = self.config.canonicalization.uri(),
            method = self.config.algorithm.xml_dsig_uri(),
            id = escape(reference_id),
            enveloped = transforms::ENVELOPED_SIGNATURE,
            digest_method = digest_algorithm.xml_dsig_uri(),
            digest = base64::engine::general_purpose::STANDARD.encode(digest),
            key_info = self.key_info(),
        );

        let mut signature = XmlElement::parse(&template)?;
        signature.rescope(target.namespaces_in_scope());

        let signed_info = signature
            .child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| SamlError::MissingElement("ds:SignedInfo".to_string()))?
            .canonicalize(self.config.canonicalization);
        let value = self
            .key
            .sign(self.config.algorithm, signed_info.as_bytes())?;

        signature
            .child_mut(XMLDSIG_NS, "SignatureValue")
            .ok_or_else(|| SamlError::MissingElement("ds:SignatureValue".to_string()))?
            .set_text(base64::engine::general_purpose::STANDARD.encode(value));

        let position = target
            .node_position(SAML_NS, "Issuer")
            .map_or(0, |issuer| issuer + 1);
        target.insert_node(position, XmlNode::Element(signature));

        debug!(
            "Signed {reference_id} with {}",
            self.config.algorithm.xml_dsig_uri()
        );
        Ok(root.serialize())
    }

    fn key_info(&self) -> String {
        match &self.certificate_der {
            Some(der) if self.config.include_certificate => format!(
                "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>",
                base64::engine::general_purpose::STANDARD.encode(der)
            ),
            _ => String::new(),
        }
    }
}
