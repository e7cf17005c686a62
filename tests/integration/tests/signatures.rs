//! Signature verification and wrapping resistance.

use samltrust::{
    IdentityProviderConfig, RejectionReason, SamlError, ValidationOrchestrator, ValidationSettings,
};
use samltrust_crypto::{DigestAlgorithm, SignatureAlgorithm};

use crate::common::{context, init_tracing, split_signature, AssertionBuilder, TestIdp, IDP};

#[test]
fn accepts_ecdsa_and_rsa_signatures() -> anyhow::Result<()> {
    init_tracing();
    let assertion = AssertionBuilder::default();

    for idp in [
        TestIdp::ecdsa()?,
        TestIdp::rsa(SignatureAlgorithm::RsaSha256)?,
        TestIdp::rsa(SignatureAlgorithm::RsaSha512)?,
    ] {
        let xml = idp.sign(&assertion.build(), assertion.id())?;
        let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context())?;

        let accepted = result.accepted().expect("assertion should be accepted");
        assert_eq!(accepted.issuer, IDP);
        assert_eq!(accepted.verified_by, vec![idp.key().id().to_string()]);
    }
    Ok(())
}

#[test]
fn tampered_claims_fail_verification() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let xml = idp
        .sign(&assertion.build(), assertion.id())?
        .replace("alice@example.com", "admin@example.com");

    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::SignatureVerificationFailed));
    Ok(())
}

#[test]
fn signature_moved_into_subject_violates_locality() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let (unsigned, signature) = split_signature(&idp.sign(&assertion.build(), assertion.id())?);
    let moved = unsigned.replace("</saml:Subject>", &format!("{signature}</saml:Subject>"));

    let result = ValidationOrchestrator::default().validate(&moved, &idp.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::SignatureLocalityViolation));
    Ok(())
}

#[test]
fn wrapped_original_does_not_vouch_for_outer_assertion() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let genuine = AssertionBuilder::default();
    let signed = idp.sign(&genuine.build(), genuine.id())?;

    // Same ID as the genuine assertion, which now hides inside Advice.
    let forged = AssertionBuilder::default()
        .build()
        .replace("alice@example.com", "admin@example.com")
        .replace("<saml:Conditions", &format!("<saml:Advice>{signed}</saml:Advice><saml:Conditions"));

    let result = ValidationOrchestrator::default().validate(&forged, &idp.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::SignatureLocalityViolation));
    Ok(())
}

#[test]
fn later_candidate_key_verifies() -> anyhow::Result<()> {
    init_tracing();
    let stale = TestIdp::ecdsa()?;
    let current = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let xml = current.sign(&assertion.build(), assertion.id())?;

    let config = IdentityProviderConfig::new(IDP)
        .with_key(stale.key().clone())
        .with_key(current.key().clone());
    let result = ValidationOrchestrator::default().validate(&xml, &config, &context())?;

    let accepted = result.accepted().expect("second key should verify");
    assert_eq!(accepted.verified_by, vec![current.key().id().to_string()]);
    Ok(())
}

#[test]
fn wrong_key_only_fails_verification() -> anyhow::Result<()> {
    init_tracing();
    let signer = TestIdp::ecdsa()?;
    let other = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let xml = signer.sign(&assertion.build(), assertion.id())?;

    let result = ValidationOrchestrator::default().validate(&xml, &other.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::SignatureVerificationFailed));
    Ok(())
}

#[test]
fn downgraded_algorithms_are_not_allowed() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::rsa(SignatureAlgorithm::RsaSha256)?;
    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?;

    let swaps = [
        (
            SignatureAlgorithm::RsaSha256.xml_dsig_uri(),
            SignatureAlgorithm::HmacSha256.xml_dsig_uri(),
        ),
        (
            SignatureAlgorithm::RsaSha256.xml_dsig_uri(),
            SignatureAlgorithm::RsaSha1.xml_dsig_uri(),
        ),
        (DigestAlgorithm::Sha256.xml_dsig_uri(), DigestAlgorithm::Sha1.xml_dsig_uri()),
    ];

    for (from, to) in swaps {
        let downgraded = xml.replace(from, to);
        let result = ValidationOrchestrator::default().validate(&downgraded, &idp.config(), &context())?;
        assert_eq!(result.rejection(), Some(RejectionReason::AlgorithmNotAllowed), "{to}");
    }
    Ok(())
}

#[test]
fn sha1_can_be_opted_into_but_hmac_cannot() -> anyhow::Result<()> {
    let settings = ValidationSettings::default()
        .allow_signature_algorithm(SignatureAlgorithm::RsaSha1)
        .allow_digest_algorithm(DigestAlgorithm::Sha1);
    assert!(settings.validate().is_ok());

    let hmac = ValidationSettings::default().allow_signature_algorithm(SignatureAlgorithm::HmacSha1);
    assert!(matches!(hmac.validate(), Err(SamlError::Config(_))));
    Ok(())
}

#[test]
fn unsigned_assertion_is_a_structural_error() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let result = ValidationOrchestrator::default().validate(
        &AssertionBuilder::default().build(),
        &idp.config(),
        &context(),
    );
    assert!(matches!(result, Err(SamlError::MissingElement(_))));
    Ok(())
}

#[test]
fn doctype_is_refused() -> anyhow::Result<()> {
    let idp = TestIdp::ecdsa()?;
    let xml = format!(
        r#"<!DOCTYPE x [<!ENTITY e "boom">]>{}"#,
        AssertionBuilder::default().build()
    );
    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context());
    assert!(matches!(result, Err(SamlError::XmlParse(_))));
    Ok(())
}

#[test]
fn allowing_hmac_does_not_enable_it() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?.replace(
        SignatureAlgorithm::EcdsaSha256.xml_dsig_uri(),
        SignatureAlgorithm::HmacSha256.xml_dsig_uri(),
    );

    let settings = ValidationSettings::default().allow_signature_algorithm(SignatureAlgorithm::HmacSha256);
    let result = ValidationOrchestrator::new(settings).validate(&xml, &idp.config(), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::AlgorithmNotAllowed));
    Ok(())
}

#[test]
fn deeply_nested_input_is_refused() -> anyhow::Result<()> {
    let idp = TestIdp::ecdsa()?;
    let depth = 200_000;
    let xml = format!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a">{}{}</saml:Assertion>"#,
        "<x>".repeat(depth),
        "</x>".repeat(depth)
    );
    let result = ValidationOrchestrator::default().validate(&xml, &idp.config(), &context());
    assert!(matches!(result, Err(SamlError::XmlParse(_))));
    Ok(())
}
