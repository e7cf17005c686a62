//! Assertions delivered inside a `samlp:Response`.

use samltrust::{RejectionReason, SamlError, ValidationOrchestrator, ValidationSettings};

use crate::common::{context, init_tracing, response, AssertionBuilder, TestIdp, ACS};

#[test]
fn signed_response_and_assertion_are_both_verified() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let signed_assertion = idp.sign(&assertion.build(), assertion.id())?;
    let xml = idp.sign(&response(ACS, None, &signed_assertion), "_response")?;

    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context())?;
    let accepted = result.accepted().expect("response should be accepted");
    assert_eq!(accepted.verified_by.len(), 2);
    assert_eq!(accepted.name_id.as_ref().map(|n| n.value.as_str()), Some("alice@example.com"));
    Ok(())
}

#[test]
fn signed_assertion_in_unsigned_response() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let signed_assertion = idp.sign(&assertion.build(), assertion.id())?;
    let xml = response(ACS, None, &signed_assertion);

    let strict = ValidationOrchestrator::new(
        ValidationSettings::default().with_require_signed_assertions(true),
    );
    assert!(strict.validate(&xml, &idp.config(), &context())?.is_accepted());
    Ok(())
}

#[test]
fn require_signed_assertions_refuses_response_only_signature() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let xml = idp.sign(&response(ACS, None, &AssertionBuilder::default().build()), "_response")?;

    assert!(ValidationOrchestrator::default()
        .validate(&xml, &idp.config(), &context())?
        .is_accepted());

    let strict = ValidationOrchestrator::new(
        ValidationSettings::default().with_require_signed_assertions(true),
    );
    assert!(matches!(
        strict.validate(&xml, &idp.config(), &context()),
        Err(SamlError::MissingElement(_))
    ));
    Ok(())
}

#[test]
fn response_destination_must_match() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let xml = idp.sign(
        &response("https://attacker.example.com/acs", None, &AssertionBuilder::default().build()),
        "_response",
    )?;

    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::RecipientMismatch));
    Ok(())
}

#[test]
fn response_correlation_must_match() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let xml = idp.sign(
        &response(ACS, Some("_request-1"), &AssertionBuilder::default().build()),
        "_response",
    )?;

    let result = ValidationOrchestrator::default().validate(
        &xml,
        &idp.config(),
        &context().with_in_response_to("_request-2"),
    )?;
    assert_eq!(result.rejection(), Some(RejectionReason::CorrelationMismatch));
    Ok(())
}

#[test]
fn two_assertions_are_refused() -> anyhow::Result<()> {
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default().build();
    let xml = response(ACS, None, &format!("{assertion}{assertion}"));

    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context());
    assert!(matches!(result, Err(SamlError::InvalidElement(_))));
    Ok(())
}
