//! Authentication and authorization logic.
//!
//! Provides password hashing, signed token issuance and verification, the
//! refresh-token session registry, and federated identity verification.

pub mod federated;
pub mod password;
pub mod session;
pub mod token;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad signature, expired, malformed, or the wrong kind of token.
    #[error("Invalid token")]
    InvalidToken,

    /// A signature-valid refresh token was presented that is no longer in the
    /// user's list. The list has already been wiped when this is returned.
    #[error("Refresh token reuse detected for user {0}")]
    RefreshTokenReuseDetected(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
