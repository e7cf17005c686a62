//! Identity provider key configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SamlResult;

use super::loader::CertificateProvider;
use super::material::{KeyMaterial, KeySource, KeyUsage};

/// Key configuration of one remote identity provider.
#[derive(Debug, Clone, Default)]
pub struct IdentityProviderConfig {
    entity_id: String,
    keys: Option<Vec<KeyMaterial>>,
    certificate_data: Option<String>,
    certificate_file: Option<PathBuf>,
}

impl IdentityProviderConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration from deserialized settings, parsing every
    /// certificate eagerly.
    ///
    /// # Errors
    ///
    /// Returns `Rejected(InvalidCertificateStructure)` for a malformed
    /// certificate, or a configuration error for a malformed fingerprint.
    pub fn from_settings(settings: IdentityProviderSettings) -> SamlResult<Self> {
        let mut keys = settings
            .keys
            .iter()
            .map(|key| {
                KeyMaterial::from_x509_base64(
                    &key.x509_certificate,
                    KeyUsage::from_flags(key.signing, key.encryption),
                    KeySource::Metadata,
                )
            })
            .collect::<SamlResult<Vec<_>>>()?;

        for fingerprint in &settings.fingerprints {
            keys.push(KeyMaterial::pinned_fingerprint(fingerprint, KeyUsage::Signing)?);
        }

        Ok(Self {
            entity_id: settings.entity_id,
            keys: (!keys.is_empty()).then_some(keys),
            certificate_data: settings.certificate_data,
            certificate_file: settings.certificate_file,
        })
    }

    /// Parses JSON settings and builds the configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::from_settings`]; malformed JSON is a configuration error.
    pub fn from_json(json: &str) -> SamlResult<Self> {
        Self::from_settings(serde_json::from_str(json)?)
    }

    /// Adds a key.
    #[must_use]
    pub fn with_key(mut self, key: KeyMaterial) -> Self {
        self.keys.get_or_insert_with(Vec::new).push(key);
        self
    }

    /// Sets inline PEM certificate data.
    #[must_use]
    pub fn with_certificate_data(mut self, pem: impl Into<String>) -> Self {
        self.certificate_data = Some(pem.into());
        self
    }

    /// Sets the PEM certificate file.
    #[must_use]
    pub fn with_certificate_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_file = Some(path.into());
        self
    }

    /// Returns the entity ID.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl CertificateProvider for IdentityProviderConfig {
    fn keys(&self) -> Option<&[KeyMaterial]> {
        self.keys.as_deref()
    }

    fn certificate_data(&self) -> Option<&str> {
        self.certificate_data.as_deref()
    }

    fn certificate_file(&self) -> Option<&Path> {
        self.certificate_file.as_deref()
    }
}

/// Serialized identity provider key settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProviderSettings {
    /// Entity ID of the identity provider.
    pub entity_id: String,

    /// Metadata-style keys.
    pub keys: Vec<KeySettings>,

    /// Pinned certificate fingerprints (SHA-1 or SHA-256, hex).
    pub fingerprints: Vec<String>,

    /// Inline PEM certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_data: Option<String>,

    /// PEM certificate file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_file: Option<PathBuf>,
}

/// One metadata-style key entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySettings {
    /// Declared for signing.
    #[serde(default)]
    pub signing: bool,

    /// Declared for encryption.
    #[serde(default)]
    pub encryption: bool,

    /// Base64 DER certificate.
    #[serde(rename = "X509Certificate")]
    pub x509_certificate: String,
}
