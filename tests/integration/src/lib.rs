//! End-to-end tests for SAML trust validation live under `tests/`.
