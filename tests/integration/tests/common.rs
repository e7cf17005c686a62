//! Common test utilities and fixtures.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use samltrust::{
    IdentityProviderConfig, KeyMaterial, KeySource, KeyUsage, SignatureConfig, ValidationContext,
    ValidationSettings, XmlSigner,
};
use samltrust_crypto::{EcCurve, SignatureAlgorithm, SigningKey};
use tracing_subscriber::EnvFilter;

pub const IDP: &str = "https://idp.example.com";
pub const SP: &str = "https://sp.example.com";
pub const ACS: &str = "https://sp.example.com/acs";

/// A real (expired, 1024-bit) certificate. Never used to verify anything.
pub const CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----
MIICgTCCAeoCCQCbOlrWDdX7FTANBgkqhkiG9w0BAQUFADCBhDELMAkGA1UEBhMC
Tk8xGDAWBgNVBAgTD0FuZHJlYXMgU29sYmVyZzEMMAoGA1UEBxMDRm9vMRAwDgYD
VQQKEwdVTklORVRUMRgwFgYDVQQDEw9mZWlkZS5lcmxhbmcubm8xITAfBgkqhkiG
9w0BCQEWEmFuZHJlYXNAdW5pbmV0dC5ubzAeFw0wNzA2MTUxMjAxMzVaFw0wNzA4
MTQxMjAxMzVaMIGEMQswCQYDVQQGEwJOTzEYMBYGA1UECBMPQW5kcmVhcyBTb2xi
ZXJnMQwwCgYDVQQHEwNGb28xEDAOBgNVBAoTB1VOSU5FVFQxGDAWBgNVBAMTD2Zl
aWRlLmVybGFuZy5ubzEhMB8GCSqGSIb3DQEJARYSYW5kcmVhc0B1bmluZXR0Lm5v
MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDivbhR7P516x/S3BqKxupQe0LO
NoliupiBOesCO3SHbDrl3+q9IbfnfmE04rNuMcPsIxB161TdDpIesLCn7c8aPHIS
KOtPlAeTZSnb8QAu7aRjZq3+PbrP5uW3TcfCGPtKTytHOge/OlJbo078dVhXQ14d
1EDwXJW1rRXuUt4C8QIDAQABMA0GCSqGSIb3DQEBBQUAA4GBACDVfp86HObqY+e8
BUoWQ9+VMQx1ASDohBjwOsg2WykUqRXF+dLfcUH9dWR63CtZIKFDbStNomPnQz7n
bK+onygwBspVEbnHuUihZq3ZUdmumQqCw4Uvs/1Uvq3orOo/WJVhTyvLgFVK2Qar
Q4/67OZfHd7R+POBXhophSMv1ZOo
-----END CERTIFICATE-----
";

/// Installs a fmt subscriber once per test binary.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("samltrust=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Fixed evaluation time.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A context expecting our ACS URL and SP entity ID, default clock skew.
pub fn context() -> ValidationContext {
    ValidationSettings::default().context(now(), ACS).with_audience(SP)
}

/// An identity provider holding a freshly generated signing key.
pub struct TestIdp {
    signer: XmlSigner,
    key: KeyMaterial,
}

impl TestIdp {
    pub fn ecdsa() -> anyhow::Result<Self> {
        Self::with_key(SigningKey::generate_ecdsa(EcCurve::P256)?, None)
    }

    pub fn rsa(algorithm: SignatureAlgorithm) -> anyhow::Result<Self> {
        Self::with_key(SigningKey::generate_rsa()?, Some(SignatureConfig::with_algorithm(algorithm)))
    }

    fn with_key(signing_key: SigningKey, config: Option<SignatureConfig>) -> anyhow::Result<Self> {
        let key = KeyMaterial::from_public_key(&signing_key.public_key(), KeyUsage::Signing, KeySource::Metadata);
        let mut signer = XmlSigner::new(signing_key, None);
        if let Some(config) = config {
            signer = signer.with_config(config);
        }
        Ok(Self { signer, key })
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Provider configuration trusting only this IdP's key.
    pub fn config(&self) -> IdentityProviderConfig {
        IdentityProviderConfig::new(IDP).with_key(self.key.clone())
    }

    pub fn sign(&self, xml: &str, id: &str) -> anyhow::Result<String> {
        Ok(self.signer.sign(xml, id)?)
    }
}

/// An identity provider whose key is bound to a self-signed certificate.
pub struct CertifiedIdp {
    pkcs8: Vec<u8>,
    pub pem: String,
    pub der: Vec<u8>,
}

impl CertifiedIdp {
    pub fn generate() -> anyhow::Result<Self> {
        let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        let certificate = rcgen::CertificateParams::new(vec!["idp.example.com".to_string()])?
            .self_signed(&key_pair)?;
        Ok(Self {
            pkcs8: key_pair.serialize_der(),
            pem: certificate.pem(),
            der: certificate.der().to_vec(),
        })
    }

    /// Signs with the certificate embedded in `KeyInfo`.
    pub fn sign(&self, xml: &str, id: &str) -> anyhow::Result<String> {
        self.sign_with(Some(self.der.clone()), xml, id)
    }

    /// Signs without `KeyInfo`.
    pub fn sign_bare(&self, xml: &str, id: &str) -> anyhow::Result<String> {
        self.sign_with(None, xml, id)
    }

    fn sign_with(&self, certificate: Option<Vec<u8>>, xml: &str, id: &str) -> anyhow::Result<String> {
        let key = SigningKey::ecdsa_from_pkcs8(EcCurve::P256, &self.pkcs8)?;
        Ok(XmlSigner::new(key, certificate).sign(xml, id)?)
    }
}

/// Builds assertion XML with sensible, currently valid defaults.
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    id: String,
    name_id: String,
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: DateTime<Utc>,
    audience: String,
    recipient: String,
    in_response_to: Option<String>,
}

impl Default for AssertionBuilder {
    fn default() -> Self {
        Self {
            id: "_assertion".to_string(),
            name_id: "alice@example.com".to_string(),
            not_before: Some(now() - Duration::minutes(1)),
            not_on_or_after: now() + Duration::minutes(5),
            audience: SP.to_string(),
            recipient: ACS.to_string(),
            in_response_to: None,
        }
    }
}

impl AssertionBuilder {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn not_before(mut self, instant: DateTime<Utc>) -> Self {
        self.not_before = Some(instant);
        self
    }

    pub fn not_on_or_after(mut self, instant: DateTime<Utc>) -> Self {
        self.not_on_or_after = instant;
        self
    }

    pub fn audience(mut self, audience: &str) -> Self {
        self.audience = audience.to_string();
        self
    }

    pub fn in_response_to(mut self, request_id: &str) -> Self {
        self.in_response_to = Some(request_id.to_string());
        self
    }

    pub fn build(&self) -> String {
        let not_before = self
            .not_before
            .map(|instant| format!(r#" NotBefore="{}""#, stamp(instant)))
            .unwrap_or_default();
        let in_response_to = self
            .in_response_to
            .as_ref()
            .map(|id| format!(r#" InResponseTo="{id}""#))
            .unwrap_or_default();

        format!(
            concat!(
                r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{issued}">"#,
                "<saml:Issuer>{idp}</saml:Issuer>",
                "<saml:Subject><saml:NameID>{name_id}</saml:NameID>",
                r#"<saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">"#,
                r#"<saml:SubjectConfirmationData Recipient="{recipient}" NotOnOrAfter="{expiry}"{in_response_to}/>"#,
                "</saml:SubjectConfirmation></saml:Subject>",
                r#"<saml:Conditions{not_before} NotOnOrAfter="{expiry}">"#,
                "<saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction>",
                "</saml:Conditions>",
                "</saml:Assertion>",
            ),
            id = self.id,
            issued = stamp(now() - Duration::minutes(1)),
            idp = IDP,
            name_id = self.name_id,
            recipient = self.recipient,
            expiry = stamp(self.not_on_or_after),
            in_response_to = in_response_to,
            not_before = not_before,
            audience = self.audience,
        )
    }
}

/// Wraps assertion XML in a `samlp:Response`.
pub fn response(destination: &str, in_response_to: Option<&str>, assertion: &str) -> String {
    let in_response_to = in_response_to
        .map(|id| format!(r#" InResponseTo="{id}""#))
        .unwrap_or_default();
    format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_response" Version="2.0" IssueInstant="{issued}" Destination="{destination}"{in_response_to}><saml:Issuer>{IDP}</saml:Issuer><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>{assertion}</samlp:Response>"#,
        issued = stamp(now()),
    )
}

pub fn stamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Cuts the `ds:Signature` element out of serialized XML.
pub fn split_signature(xml: &str) -> (String, String) {
    let start = xml.find("<ds:Signature").unwrap();
    let end = xml.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
    let signature = xml[start..end].to_string();
    let rest = format!("{}{}", &xml[..start], &xml[end..]);
    (rest, signature)
}
