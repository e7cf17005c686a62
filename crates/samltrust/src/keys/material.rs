//! Normalized key material.

use std::fmt;

use base64::Engine;
use samltrust_crypto::{
    constant_time_eq, hash, normalize_fingerprint, DigestAlgorithm, EcCurve, PublicKey,
    SignatureError,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RejectionReason, SamlError, SamlResult};
use crate::types::{MD_NS, XMLDSIG_NS};
use crate::xml::XmlElement;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Declared purpose of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// Signing only.
    Signing,
    /// Encryption only.
    Encryption,
    /// Declared for both signing and encryption.
    Both,
    /// No usage declared; usable for anything.
    Unspecified,
}

impl KeyUsage {
    /// Builds a usage from the metadata `use` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidElement`] for values other than
    /// `signing` and `encryption`.
    pub fn from_metadata_use(value: Option<&str>) -> SamlResult<Self> {
        match value {
            None => Ok(Self::Unspecified),
            Some("signing") => Ok(Self::Signing),
            Some("encryption") => Ok(Self::Encryption),
            Some(other) => Err(SamlError::InvalidElement(format!(
                "KeyDescriptor use '{other}' is not signing or encryption"
            ))),
        }
    }

    /// Builds a usage from independent signing/encryption flags.
    #[must_use]
    pub const fn from_flags(signing: bool, encryption: bool) -> Self {
        match (signing, encryption) {
            (true, true) => Self::Both,
            (true, false) => Self::Signing,
            (false, true) => Self::Encryption,
            (false, false) => Self::Unspecified,
        }
    }

    /// Returns true if a key with this usage may be used as `requested`.
    ///
    /// Unspecified usage satisfies every request. An explicit usage only
    /// satisfies the same usage, or a request for any usage.
    #[must_use]
    pub const fn satisfies(self, requested: RequestedUsage) -> bool {
        match (self, requested) {
            (_, RequestedUsage::Any)
            | (Self::Unspecified | Self::Both, _)
            | (Self::Signing, RequestedUsage::Signing)
            | (Self::Encryption, RequestedUsage::Encryption) => true,
            (Self::Signing, RequestedUsage::Encryption)
            | (Self::Encryption, RequestedUsage::Signing) => false,
        }
    }
}

/// The usage a caller needs a key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestedUsage {
    /// Verifying signatures.
    Signing,
    /// Encrypting to the entity.
    Encryption,
    /// No restriction.
    Any,
}

/// Where a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Inline in entity metadata.
    Metadata,
    /// A configured certificate file.
    CertificateFile,
    /// Configured inline certificate data.
    CertificateData,
    /// An explicitly pinned key or fingerprint.
    ExplicitOverride,
}

impl KeySource {
    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::CertificateFile => "certificate file",
            Self::CertificateData => "certificate data",
            Self::ExplicitOverride => "explicit override",
        }
    }
}

/// The encoding of [`KeyMaterial::bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    /// DER-encoded X.509 certificate.
    X509Certificate,
    /// DER-encoded PKCS#1 `RSAPublicKey`.
    RsaPublicKey,
    /// Uncompressed EC point on the given curve.
    EcPublicKey(EcCurve),
    /// Certificate digest; matched against certificates embedded in a signature.
    Fingerprint(DigestAlgorithm),
}

/// A normalized key plus its declared usage and provenance.
///
/// Immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    id: String,
    bytes: Vec<u8>,
    format: KeyFormat,
    usage: KeyUsage,
    source: KeySource,
    certificate_base64: Option<String>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("usage", &self.usage)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Parses a PEM certificate.
    ///
    /// The text must consist of the `BEGIN CERTIFICATE` marker, a base64
    /// body and the `END CERTIFICATE` marker. Whitespace inside the body is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `Rejected(InvalidCertificateStructure)` if the armour, the
    /// base64 or the certificate itself is malformed.
    pub fn from_pem(pem: &str, usage: KeyUsage, source: KeySource) -> SamlResult<Self> {
        let body = pem
            .trim()
            .strip_prefix(PEM_BEGIN)
            .and_then(|rest| rest.strip_suffix(PEM_END))
            .ok_or_else(|| {
                warn!("Certificate from {} is not PEM armoured", source.as_str());
                RejectionReason::InvalidCertificateStructure
            })?;
        Self::from_x509_base64(body, usage, source)
    }

    /// Parses a base64 DER certificate, as found in `ds:X509Certificate`.
    ///
    /// # Errors
    ///
    /// Returns `Rejected(InvalidCertificateStructure)` if the base64 or the
    /// certificate is malformed.
    pub fn from_x509_base64(base64_text: &str, usage: KeyUsage, source: KeySource) -> SamlResult<Self> {
        let normalized: String = base64_text.chars().filter(|c| !c.is_whitespace()).collect();
        let well_formed = !normalized.is_empty()
            && normalized
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
        if !well_formed {
            warn!("Certificate from {} has a malformed base64 body", source.as_str());
            return Err(RejectionReason::InvalidCertificateStructure.into());
        }

        let der = base64::engine::general_purpose::STANDARD
            .decode(&normalized)
            .map_err(|e| {
                warn!("Certificate from {} is not valid base64: {e}", source.as_str());
                RejectionReason::InvalidCertificateStructure
            })?;

        let mut key = Self::from_certificate_der(der, usage, source)?;
        key.certificate_base64 = Some(normalized);
        Ok(key)
    }

    /// Wraps a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns `Rejected(InvalidCertificateStructure)` if the DER is not an
    /// X.509 certificate with a supported key.
    pub fn from_certificate_der(der: Vec<u8>, usage: KeyUsage, source: KeySource) -> SamlResult<Self> {
        if let Err(e) = PublicKey::from_certificate_der(&der) {
            warn!("Certificate from {} rejected: {e}", source.as_str());
            return Err(RejectionReason::InvalidCertificateStructure.into());
        }

        Ok(Self {
            id: hex_id(&der),
            certificate_base64: Some(base64::engine::general_purpose::STANDARD.encode(&der)),
            bytes: der,
            format: KeyFormat::X509Certificate,
            usage,
            source,
        })
    }

    /// Wraps a bare public key.
    #[must_use]
    pub fn from_public_key(key: &PublicKey, usage: KeyUsage, source: KeySource) -> Self {
        let format = match key {
            PublicKey::Rsa(_) => KeyFormat::RsaPublicKey,
            PublicKey::Ec { curve, .. } => KeyFormat::EcPublicKey(*curve),
        };
        let bytes = key.as_bytes().to_vec();
        Self {
            id: hex_id(&bytes),
            bytes,
            format,
            usage,
            source,
            certificate_base64: None,
        }
    }

    /// Pins a certificate by its SHA-1 or SHA-256 fingerprint.
    ///
    /// Separators (`:` or whitespace) and case are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the text is not a hex digest of a
    /// supported length.
    pub fn pinned_fingerprint(fingerprint: &str, usage: KeyUsage) -> SamlResult<Self> {
        let normalized = normalize_fingerprint(fingerprint).ok_or_else(|| {
            SamlError::Config(format!("'{fingerprint}' is not a SHA-1 or SHA-256 fingerprint"))
        })?;
        let bytes = hex::decode(&normalized).map_err(|e| SamlError::Config(e.to_string()))?;
        let algorithm = samltrust_crypto::hash::fingerprint_algorithm(bytes.len())
            .ok_or_else(|| SamlError::Config("unsupported fingerprint length".to_string()))?;

        Ok(Self {
            id: normalized,
            bytes,
            format: KeyFormat::Fingerprint(algorithm),
            usage,
            source: KeySource::ExplicitOverride,
            certificate_base64: None,
        })
    }

    /// Reads every certificate of a metadata `md:KeyDescriptor`.
    ///
    /// # Errors
    ///
    /// Returns a structural error for a malformed descriptor, or
    /// `Rejected(InvalidCertificateStructure)` for a malformed certificate.
    pub fn from_key_descriptor(descriptor: &XmlElement) -> SamlResult<Vec<Self>> {
        if !descriptor.is(MD_NS, "KeyDescriptor") {
            return Err(SamlError::InvalidElement(format!(
                "expected md:KeyDescriptor, found {}",
                descriptor.qualified_name()
            )));
        }
        let usage = KeyUsage::from_metadata_use(descriptor.attribute("use"))?;

        let keys = descriptor
            .children_named(XMLDSIG_NS, "KeyInfo")
            .flat_map(|info| info.children_named(XMLDSIG_NS, "X509Data"))
            .flat_map(|data| data.children_named(XMLDSIG_NS, "X509Certificate"))
            .map(|cert| Self::from_x509_base64(&cert.text(), usage, KeySource::Metadata))
            .collect::<SamlResult<Vec<_>>>()?;

        if keys.is_empty() {
            return Err(SamlError::MissingElement(
                "KeyDescriptor without ds:X509Certificate".to_string(),
            ));
        }
        Ok(keys)
    }

    /// Returns the key identifier: the lowercase hex SHA-256 of the key
    /// bytes, or the normalized fingerprint for pinned keys.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the raw key bytes, encoded as given by [`Self::format`].
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the key encoding.
    pub const fn format(&self) -> KeyFormat {
        self.format
    }

    /// Returns the declared usage.
    pub const fn usage(&self) -> KeyUsage {
        self.usage
    }

    /// Returns where the key came from.
    pub const fn source(&self) -> KeySource {
        self.source
    }

    /// Returns the base64 certificate body, when the key came from one.
    pub fn certificate_base64(&self) -> Option<&str> {
        self.certificate_base64.as_deref()
    }

    /// Returns true if this key may be used as `requested`.
    pub const fn satisfies(&self, requested: RequestedUsage) -> bool {
        self.usage.satisfies(requested)
    }

    /// Resolves the public key used to verify a signature.
    ///
    /// Fingerprints resolve through the certificates embedded in the
    /// signature; `Ok(None)` means none of them matched.
    pub(crate) fn verification_key(
        &self,
        embedded_certificates: &[Vec<u8>],
    ) -> Result<Option<PublicKey>, SignatureError> {
        match self.format {
            KeyFormat::X509Certificate => PublicKey::from_certificate_der(&self.bytes).map(Some),
            KeyFormat::RsaPublicKey => Ok(Some(PublicKey::Rsa(self.bytes.clone()))),
            KeyFormat::EcPublicKey(curve) => Ok(Some(PublicKey::Ec {
                curve,
                point: self.bytes.clone(),
            })),
            KeyFormat::Fingerprint(algorithm) => embedded_certificates
                .iter()
                .find(|der| constant_time_eq(&hash(algorithm, der), &self.bytes))
                .map(|der| PublicKey::from_certificate_der(der))
                .transpose(),
        }
    }
}

fn hex_id(bytes: &[u8]) -> String {
    samltrust_crypto::fingerprint(DigestAlgorithm::Sha256, bytes)
}
