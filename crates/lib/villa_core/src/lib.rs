//! # villa_core
//!
//! Core session logic for Magic Villa: credential checks, access-token
//! signing, the refresh-token ledger and the rotation protocol.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
