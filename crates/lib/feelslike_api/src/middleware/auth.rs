//! Authentication middleware: bearer token extraction and verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use feelslike_core::models::auth::{TokenKind, User};
use feelslike_core::store::UserStore;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The caller resolved from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it as
/// an access token, loads the user and injects [`AuthenticatedUser`] into
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Token is required".into()))?;

    let denied = || AppError::Unauthorized("Access Denied".into());

    let verified = state
        .tokens
        .verify_token(token, TokenKind::Access)
        .map_err(|e| {
            debug!(error = %e, "access token rejected");
            denied()
        })?;

    let user = state
        .store
        .find_user_by_id(verified.user_id)
        .await?
        .ok_or_else(|| {
            debug!(user_id = %verified.user_id, "access token for unknown user");
            denied()
        })?;

    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

/// Second whitespace-separated part of the header value, if non-empty.
fn bearer_token(header: &str) -> Option<&str> {
    header.split_whitespace().nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_takes_second_part() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token(""), None);
    }
}
