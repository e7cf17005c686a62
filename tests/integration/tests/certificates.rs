//! Signatures verified through certificates and pinned fingerprints.

use std::io::Write;

use samltrust::{
    IdentityProviderConfig, KeyLoader, KeyMaterial, KeyUsage, RejectionReason, RequestedUsage,
    ValidationOrchestrator, ValidationResult, XmlElement,
};
use samltrust_crypto::{fingerprint, DigestAlgorithm};

use crate::common::{context, init_tracing, AssertionBuilder, CertifiedIdp, IDP};

fn validate(xml: &str, config: &IdentityProviderConfig) -> anyhow::Result<ValidationResult> {
    Ok(ValidationOrchestrator::default().validate(xml, config, &context())?)
}

fn certificate_body(pem: &str) -> String {
    pem.lines().filter(|line| !line.starts_with("-----")).collect()
}

#[test]
fn certificate_data_verifies_signature() -> anyhow::Result<()> {
    init_tracing();
    let idp = CertifiedIdp::generate()?;
    let assertion = AssertionBuilder::default();
    let xml = idp.sign_bare(&assertion.build(), assertion.id())?;

    let config = IdentityProviderConfig::new(IDP).with_certificate_data(idp.pem.clone());
    let expected_id = KeyLoader::load(&config, RequestedUsage::Signing, true)?
        .first()
        .map(|key| key.id().to_string());

    let result = validate(&xml, &config)?;
    let accepted = result.accepted().expect("accepted");
    assert_eq!(accepted.verified_by.first().cloned(), expected_id);
    Ok(())
}

#[test]
fn certificate_file_verifies_signature() -> anyhow::Result<()> {
    init_tracing();
    let idp = CertifiedIdp::generate()?;
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(idp.pem.as_bytes())?;

    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?;

    let config = IdentityProviderConfig::new(IDP).with_certificate_file(file.path());
    assert!(validate(&xml, &config)?.is_accepted());
    Ok(())
}

#[test]
fn metadata_certificate_verifies_signature() -> anyhow::Result<()> {
    init_tracing();
    let idp = CertifiedIdp::generate()?;
    let descriptor = XmlElement::parse(&format!(
        r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" use="signing"><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>"#,
        certificate_body(&idp.pem)
    ))?;
    let config = KeyMaterial::from_key_descriptor(&descriptor)?
        .into_iter()
        .fold(IdentityProviderConfig::new(IDP), IdentityProviderConfig::with_key);

    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?;
    assert!(validate(&xml, &config)?.is_accepted());

    let tampered = xml.replace("alice@example.com", "mallory@example.com");
    assert_eq!(
        validate(&tampered, &config)?.rejection(),
        Some(RejectionReason::SignatureVerificationFailed)
    );
    Ok(())
}

#[test]
fn pinned_fingerprint_verifies_through_embedded_certificate() -> anyhow::Result<()> {
    init_tracing();
    let idp = CertifiedIdp::generate()?;
    let pinned = KeyMaterial::pinned_fingerprint(
        &fingerprint(DigestAlgorithm::Sha256, &idp.der),
        KeyUsage::Signing,
    )?;
    let config = IdentityProviderConfig::new(IDP).with_key(pinned);

    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?;
    assert!(validate(&xml, &config)?.is_accepted());

    // Without an embedded certificate there is nothing to match the pin.
    let bare = idp.sign_bare(&assertion.build(), assertion.id())?;
    assert_eq!(
        validate(&bare, &config)?.rejection(),
        Some(RejectionReason::SignatureVerificationFailed)
    );
    Ok(())
}

#[test]
fn embedded_certificate_must_match_the_pin() -> anyhow::Result<()> {
    init_tracing();
    let idp = CertifiedIdp::generate()?;
    let attacker = CertifiedIdp::generate()?;
    let pinned = KeyMaterial::pinned_fingerprint(
        &fingerprint(DigestAlgorithm::Sha1, &idp.der),
        KeyUsage::Signing,
    )?;
    let config = IdentityProviderConfig::new(IDP).with_key(pinned);

    let assertion = AssertionBuilder::default();
    let forged = attacker.sign(&assertion.build(), assertion.id())?;
    assert_eq!(
        validate(&forged, &config)?.rejection(),
        Some(RejectionReason::SignatureVerificationFailed)
    );
    Ok(())
}
