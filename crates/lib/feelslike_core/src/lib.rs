//! # feelslike_core
//!
//! Core domain logic for Feels Like: token issuance, refresh-token sessions,
//! credential and content stores, and uploaded media.

pub mod auth;
pub mod media;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
