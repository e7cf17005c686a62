//! Accept/reject decision for incoming assertions.
//!
//! The orchestrator runs key resolution, signature verification and claim
//! evaluation in that order and stops at the first rejection. Claims are
//! never read from XML whose signature has not verified.

use serde::Serialize;
use tracing::{debug, warn};

use crate::conditions::{ConditionsValidator, ValidationContext};
use crate::config::ValidationSettings;
use crate::error::{RejectionReason, SamlError, SamlResult};
use crate::keys::{CertificateProvider, KeyLoader, RequestedUsage};
use crate::signature::{SignatureValidator, SignedDocument};
use crate::types::{Assertion, NameId, Response, SAMLP_NS, SAML_NS};
use crate::xml::XmlElement;

/// Outcome of validating an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Every check passed.
    Accepted(AcceptedAssertion),
    /// A check failed.
    Rejected {
        /// The first check that failed.
        reason: RejectionReason,
    },
}

impl ValidationResult {
    /// Returns true if the assertion was accepted.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Returns the accepted assertion, if any.
    pub const fn accepted(&self) -> Option<&AcceptedAssertion> {
        match self {
            Self::Accepted(assertion) => Some(assertion),
            Self::Rejected { .. } => None,
        }
    }

    /// Returns the rejection reason, if any.
    pub const fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected { reason } => Some(*reason),
        }
    }
}

/// What an accepted assertion vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedAssertion {
    /// Assertion ID.
    pub id: String,
    /// Issuer entity ID.
    pub issuer: String,
    /// Subject name identifier.
    pub name_id: Option<NameId>,
    /// IDs of the keys that verified the response and/or assertion
    /// signatures, outermost first.
    pub verified_by: Vec<String>,
}

/// Validates assertions, bare or inside a `samlp:Response`.
#[derive(Debug, Clone, Default)]
pub struct ValidationOrchestrator {
    settings: ValidationSettings,
    signatures: SignatureValidator,
}

impl ValidationOrchestrator {
    /// Creates an orchestrator enforcing `settings`.
    #[must_use]
    pub fn new(settings: ValidationSettings) -> Self {
        let signatures = SignatureValidator::new(&settings);
        Self {
            settings,
            signatures,
        }
    }

    /// Returns the settings in force.
    pub const fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Validates a serialized assertion or response.
    ///
    /// # Errors
    ///
    /// Rejections are reported as `Ok(ValidationResult::Rejected { .. })`.
    /// `Err` is reserved for input that cannot be evaluated at all: XML that
    /// does not parse, a missing signature, a malformed element, or an
    /// unreadable certificate file.
    pub fn validate<P>(
        &self,
        xml: &str,
        provider: &P,
        context: &ValidationContext,
    ) -> SamlResult<ValidationResult>
    where
        P: CertificateProvider + ?Sized,
    {
        let root = XmlElement::parse(xml)?;
        self.validate_element(&root, provider, context)
    }

    /// Validates an already parsed assertion or response.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub fn validate_element<P>(
        &self,
        root: &XmlElement,
        provider: &P,
        context: &ValidationContext,
    ) -> SamlResult<ValidationResult>
    where
        P: CertificateProvider + ?Sized,
    {
        match self.evaluate(root, provider, context) {
            Ok(accepted) => {
                debug!("Accepted assertion {} from {}", accepted.id, accepted.issuer);
                Ok(ValidationResult::Accepted(accepted))
            }
            Err(SamlError::Rejected(reason)) => {
                warn!("Rejected assertion: {reason}");
                Ok(ValidationResult::Rejected { reason })
            }
            Err(e) => Err(e),
        }
    }

    fn evaluate<P>(
        &self,
        root: &XmlElement,
        provider: &P,
        context: &ValidationContext,
    ) -> SamlResult<AcceptedAssertion>
    where
        P: CertificateProvider + ?Sized,
    {
        let (response, assertion_element) = if root.is(SAMLP_NS, "Response") {
            (Some(Response::from_element(root)?), Response::single_assertion(root)?)
        } else if root.is(SAML_NS, "Assertion") {
            (None, root)
        } else {
            return Err(SamlError::InvalidElement(format!(
                "expected saml:Assertion or samlp:Response, found {}",
                root.qualified_name()
            )));
        };

        let response_signature = if response.is_some() {
            SignedDocument::locate(root, root)?
        } else {
            None
        };
        let assertion_signature = SignedDocument::locate(root, assertion_element)?;

        if assertion_signature.is_none()
            && (response_signature.is_none() || self.settings.require_signed_assertions)
        {
            return Err(SamlError::MissingElement("ds:Signature".to_string()));
        }

        let keys = KeyLoader::load(provider, RequestedUsage::Signing, true)?;

        let mut verified_by = Vec::new();
        for signed in response_signature.iter().chain(assertion_signature.iter()) {
            let key = self.signatures.verify(signed, &keys)?;
            verified_by.push(key.id().to_string());
        }

        let assertion = Assertion::from_element(assertion_element)?;

        if let Some(response) = &response {
            check_response(response, context)?;
        }

        ConditionsValidator::validate_assertion(&assertion, context)?;

        Ok(AcceptedAssertion {
            name_id: assertion.subject.and_then(|subject| subject.name_id),
            id: assertion.id,
            issuer: assertion.issuer,
            verified_by,
        })
    }
}

fn check_response(response: &Response, context: &ValidationContext) -> Result<(), RejectionReason> {
    if let Some(destination) = &response.destination {
        if destination != context.expected_recipient() {
            return Err(RejectionReason::RecipientMismatch);
        }
    }

    if let (Some(actual), Some(expected)) =
        (response.in_response_to.as_deref(), context.expected_in_response_to())
    {
        if actual != expected {
            return Err(RejectionReason::CorrelationMismatch);
        }
    }
    Ok(())
}
