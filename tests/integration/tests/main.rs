//! End-to-end integration tests.
//!
//! These tests drive the public API only: messages are signed with freshly
//! generated keys and validated the way a service provider would.

mod certificates;
mod common;
mod key_loading;
mod responses;
mod signatures;
