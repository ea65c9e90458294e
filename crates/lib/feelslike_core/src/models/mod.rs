//! Domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `feelslike_api::models` (which carry camelCase renames).

pub mod auth;
pub mod content;
