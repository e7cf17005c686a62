//! SAML Response envelope.
//!
//! Only the envelope attributes that bind a response to its recipient and
//! request are read. The carried assertion is handled separately.

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

use super::{required_attribute, SAMLP_NS, SAML_NS};

/// SAML Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// The entity ID of the identity provider that issued this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Response {
    /// Reads the envelope of a `samlp:Response` element.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the element is not a response or has
    /// no `ID`.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        if !element.is(SAMLP_NS, "Response") {
            return Err(SamlError::InvalidElement(format!(
                "expected samlp:Response, found {}",
                element.qualified_name()
            )));
        }

        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            issuer: element
                .child(SAML_NS, "Issuer")
                .map(|issuer| issuer.text().trim().to_string()),
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            destination: element.attribute("Destination").map(str::to_string),
        })
    }

    /// Returns the single assertion carried by a response element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidElement`] unless there is exactly one
    /// `saml:Assertion` child.
    pub fn single_assertion(element: &XmlElement) -> SamlResult<&XmlElement> {
        let mut assertions = element.children_named(SAML_NS, "Assertion");
        match (assertions.next(), assertions.next()) {
            (Some(assertion), None) => Ok(assertion),
            (None, _) => Err(SamlError::MissingElement("saml:Assertion".to_string())),
            (Some(_), Some(_)) => Err(SamlError::InvalidElement(
                "Response carries more than one Assertion".to_string(),
            )),
        }
    }
}
