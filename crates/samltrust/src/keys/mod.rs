//! Key material and key resolution.
//!
//! A [`KeyLoader`] turns whatever a [`CertificateProvider`] exposes into an
//! ordered [`KeyCandidateSet`]. Usage filtering is asymmetric: a key with no
//! declared usage can be used for anything, a key declared for one purpose
//! only for that purpose.

mod loader;
mod material;
mod provider;

pub use loader::{CertificateProvider, KeyCandidateSet, KeyLoader};
pub use material::{KeyFormat, KeyMaterial, KeySource, KeyUsage, RequestedUsage};
pub use provider::{IdentityProviderConfig, IdentityProviderSettings, KeySettings};
