//! SAML Assertion types.
//!
//! Only the claims the trust core evaluates are modelled: issuer, subject
//! (name identifier and confirmations) and conditions. Attribute and
//! authentication statements pass through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

use super::{confirmation_methods, parse_instant, required_attribute, SAML_NS};

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl Assertion {
    /// Reads an assertion from a `saml:Assertion` element.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the element is not an assertion or a
    /// required part is missing or malformed.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        if !element.is(SAML_NS, "Assertion") {
            return Err(SamlError::InvalidElement(format!(
                "expected saml:Assertion, found {}",
                element.qualified_name()
            )));
        }

        let version = required_attribute(element, "Version")?;
        if version != "2.0" {
            return Err(SamlError::InvalidElement(format!(
                "Unsupported SAML version: {version}"
            )));
        }

        let issuer = element
            .child(SAML_NS, "Issuer")
            .map(|issuer| issuer.text().trim().to_string())
            .filter(|issuer| !issuer.is_empty())
            .ok_or_else(|| SamlError::MissingElement("saml:Issuer".to_string()))?;

        let issue_instant = parse_instant(element, "IssueInstant")?
            .ok_or_else(|| SamlError::MissingElement("Assertion IssueInstant".to_string()))?;

        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            issue_instant,
            issuer,
            subject: element
                .child(SAML_NS, "Subject")
                .map(Subject::from_element)
                .transpose()?,
            conditions: element
                .child(SAML_NS, "Conditions")
                .map(Conditions::from_element)
                .transpose()?,
        })
    }

    /// Returns the confirmation data of every bearer confirmation, in
    /// document order. A bearer confirmation without data yields a default
    /// (empty) entry.
    #[must_use]
    pub fn bearer_confirmations(&self) -> Vec<SubjectConfirmationData> {
        self.subject
            .iter()
            .flat_map(|subject| subject.subject_confirmations.iter())
            .filter(|confirmation| confirmation.is_bearer())
            .map(|confirmation| confirmation.subject_confirmation_data.clone().unwrap_or_default())
            .collect()
    }
}

/// SAML Name ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Subject of an assertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier for the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Subject confirmations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let name_id = element.child(SAML_NS, "NameID").map(|name_id| NameId {
            value: name_id.text().trim().to_string(),
            format: name_id.attribute("Format").map(str::to_string),
        });

        let subject_confirmations = element
            .children_named(SAML_NS, "SubjectConfirmation")
            .map(SubjectConfirmation::from_element)
            .collect::<SamlResult<Vec<_>>>()?;

        Ok(Self {
            name_id,
            subject_confirmations,
        })
    }
}

/// Subject confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Creates a bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: confirmation_methods::BEARER.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.subject_confirmation_data = Some(data);
        self
    }

    /// Returns true for the bearer method.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == confirmation_methods::BEARER
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            method: required_attribute(element, "Method")?.to_string(),
            subject_confirmation_data: element
                .child(SAML_NS, "SubjectConfirmationData")
                .map(SubjectConfirmationData::from_element)
                .transpose()?,
        })
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The location to which the assertion can be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// The request ID that this assertion responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// IP address of the subject. Not enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SubjectConfirmationData {
    /// Sets the recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_not_on_or_after(mut self, instant: DateTime<Utc>) -> Self {
        self.not_on_or_after = Some(instant);
        self
    }

    /// Sets the request ID this confirmation answers.
    #[must_use]
    pub fn with_in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            recipient: element.attribute("Recipient").map(str::to_string),
            not_on_or_after: parse_instant(element, "NotOnOrAfter")?,
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            address: element.attribute("Address").map(str::to_string),
        })
    }
}

/// Conditions for assertion validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Time at or after which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions. Empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    /// Sets the start of the validity window.
    #[must_use]
    pub const fn with_not_before(mut self, instant: DateTime<Utc>) -> Self {
        self.not_before = Some(instant);
        self
    }

    /// Sets the end of the validity window.
    #[must_use]
    pub const fn with_not_on_or_after(mut self, instant: DateTime<Utc>) -> Self {
        self.not_on_or_after = Some(instant);
        self
    }

    /// Adds an audience restriction group.
    #[must_use]
    pub fn with_audience_restriction<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: audiences.into_iter().map(Into::into).collect(),
        });
        self
    }

    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let audience_restrictions = element
            .children_named(SAML_NS, "AudienceRestriction")
            .map(|restriction| {
                let audiences: Vec<String> = restriction
                    .children_named(SAML_NS, "Audience")
                    .map(|audience| audience.text().trim().to_string())
                    .collect();
                if audiences.is_empty() {
                    return Err(SamlError::InvalidElement(
                        "AudienceRestriction without Audience".to_string(),
                    ));
                }
                Ok(AudienceRestriction { audiences })
            })
            .collect::<SamlResult<Vec<_>>>()?;

        Ok(Self {
            not_before: parse_instant(element, "NotBefore")?,
            not_on_or_after: parse_instant(element, "NotOnOrAfter")?,
            audience_restrictions,
        })
    }
}

/// Audience restriction: every listed audience must be acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// List of audiences.
    pub audiences: Vec<String>,
}
