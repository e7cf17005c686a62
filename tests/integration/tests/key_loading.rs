//! Candidate key resolution from provider configuration.

use std::io::Write;

use samltrust::{
    IdentityProviderConfig, KeyFormat, KeyLoader, KeyMaterial, KeySource, KeyUsage,
    RejectionReason, RequestedUsage, ValidationOrchestrator, XmlElement,
};

use crate::common::{context, init_tracing, AssertionBuilder, TestIdp, CERTIFICATE, IDP};

#[test]
fn certificate_file_is_loaded_with_unspecified_usage() -> anyhow::Result<()> {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(CERTIFICATE.as_bytes())?;

    let config = IdentityProviderConfig::new(IDP).with_certificate_file(file.path());
    let keys = KeyLoader::load(&config, RequestedUsage::Signing, true)?;

    assert_eq!(keys.len(), 1);
    let key = keys.first().expect("one key");
    assert_eq!(key.source(), KeySource::CertificateFile);
    assert_eq!(key.usage(), KeyUsage::Unspecified);
    assert_eq!(key.format(), KeyFormat::X509Certificate);

    // Loading byte-identical input again yields the same identifier.
    let again = KeyLoader::load(&config, RequestedUsage::Encryption, true)?;
    assert_eq!(again.first().map(KeyMaterial::id), Some(key.id()));
    Ok(())
}

#[test]
fn no_keys_depends_on_required() -> anyhow::Result<()> {
    init_tracing();
    let config = IdentityProviderConfig::new(IDP);

    let err = KeyLoader::load(&config, RequestedUsage::Signing, true).unwrap_err();
    assert_eq!(err.rejection(), Some(RejectionReason::NoKeysFound));

    let keys = KeyLoader::load(&config, RequestedUsage::Signing, false)?;
    assert!(keys.is_empty());
    Ok(())
}

#[test]
fn orchestrator_reports_missing_keys_as_rejection() -> anyhow::Result<()> {
    init_tracing();
    let idp = TestIdp::ecdsa()?;
    let assertion = AssertionBuilder::default();
    let xml = idp.sign(&assertion.build(), assertion.id())?;

    let result =
        ValidationOrchestrator::default().validate(&xml, &IdentityProviderConfig::new(IDP), &context())?;
    assert_eq!(result.rejection(), Some(RejectionReason::NoKeysFound));
    Ok(())
}

#[test]
fn malformed_certificate_data_is_rejected_even_when_optional() {
    let config = IdentityProviderConfig::new(IDP)
        .with_certificate_data("-----BEGIN CERTIFICATE-----\n%%%\n-----END CERTIFICATE-----");
    let err = KeyLoader::load(&config, RequestedUsage::Any, false).unwrap_err();
    assert_eq!(err.rejection(), Some(RejectionReason::InvalidCertificateStructure));
}

#[test]
fn encryption_only_keys_fall_through_to_certificate_data() -> anyhow::Result<()> {
    let encryption = KeyMaterial::from_pem(CERTIFICATE, KeyUsage::Encryption, KeySource::Metadata)?;
    let config = IdentityProviderConfig::new(IDP)
        .with_key(encryption)
        .with_certificate_data(CERTIFICATE);

    let keys = KeyLoader::load(&config, RequestedUsage::Signing, true)?;
    assert_eq!(keys.first().map(KeyMaterial::source), Some(KeySource::CertificateData));

    let keys = KeyLoader::load(&config, RequestedUsage::Encryption, true)?;
    assert_eq!(keys.first().map(KeyMaterial::source), Some(KeySource::Metadata));
    Ok(())
}

#[test]
fn metadata_key_descriptors_become_candidates() -> anyhow::Result<()> {
    let body: String = CERTIFICATE
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let descriptor = XmlElement::parse(&format!(
        r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" use="signing"><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{body}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>"#
    ))?;

    let keys = KeyMaterial::from_key_descriptor(&descriptor)?;
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].usage(), KeyUsage::Signing);
    assert_eq!(keys[0].source(), KeySource::Metadata);
    assert_eq!(keys[0].certificate_base64(), Some(body.as_str()));
    Ok(())
}

#[test]
fn provider_settings_from_json() -> anyhow::Result<()> {
    let body: String = CERTIFICATE
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let json = serde_json::json!({
        "entity_id": IDP,
        "keys": [ { "encryption": true, "X509Certificate": body } ],
        "fingerprints": ["AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01"],
    });

    let config = IdentityProviderConfig::from_json(&json.to_string())?;
    let signing = KeyLoader::load(&config, RequestedUsage::Signing, true)?;

    assert_eq!(signing.len(), 1);
    let pinned = signing.first().expect("pinned key");
    assert_eq!(pinned.source(), KeySource::ExplicitOverride);
    assert_eq!(pinned.id(), "abcdef0123456789abcdef0123456789abcdef01");
    Ok(())
}
