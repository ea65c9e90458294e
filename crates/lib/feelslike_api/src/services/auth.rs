//! Authentication service: signup, login, federated login, refresh and
//! logout flows delegating to `feelslike_core::auth`.

use feelslike_core::auth::AuthError;
use feelslike_core::auth::federated::FederatedIdentity;
use feelslike_core::auth::password::{hash_password, verify_password};
use feelslike_core::auth::session::{consume_refresh_token, issue_session};
use feelslike_core::models::auth::{NewUser, TokenKind, TokenPair, User};
use feelslike_core::store::{StoreError, UserStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{MultipartForm, require};
use crate::models::{AuthResponse, LogoutResponse};
use crate::services::media;

fn auth_response(user_id: Uuid, pair: TokenPair) -> AuthResponse {
    AuthResponse {
        user_id,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }
}

fn invalid_refresh_token() -> AppError {
    AppError::Unauthorized("Invalid refresh token".into())
}

/// Minimal shape check: `local@domain.tld`.
fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("\"email\" must be a valid email".into()))
    }
}

async fn start_session(state: &AppState, user_id: Uuid) -> AppResult<AuthResponse> {
    let pair = issue_session(state.store.as_ref(), &state.tokens, user_id).await?;
    Ok(auth_response(user_id, pair))
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a password account from a multipart form.
///
/// A taken email is reported before any other field is looked at.
pub async fn signup(state: &AppState, mut form: MultipartForm) -> AppResult<AuthResponse> {
    let email = form.required("email")?.to_owned();
    validate_email(&email)?;

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use".into()));
    }

    let password = form.required("password")?.to_owned();
    let full_name = form.required("fullName")?.to_owned();
    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| AppError::Validation("Avatar is required".into()))?;

    let password_hash = hash_password(&password, state.config.bcrypt_cost).await?;
    let avatar = media::store_form_upload(state.media.as_ref(), &avatar).await?;

    let user = match state
        .store
        .create_user(NewUser {
            email,
            full_name,
            avatar: avatar.clone(),
            password_hash: Some(password_hash),
        })
        .await
    {
        Ok(user) => user,
        Err(e) => {
            media::discard(state.media.as_ref(), &avatar).await;
            return Err(e.into());
        }
    };

    let resp = start_session(state, user.id).await?;
    info!(user_id = %user.id, "user signed up");
    Ok(resp)
}

/// Authenticate with email and password.
///
/// Unknown email, wrong password and password-less accounts all fail the
/// same way.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<AuthResponse> {
    let email = require("email", Some(email))?;
    let password = require("password", Some(password))?;
    validate_email(email)?;

    let found = state.store.find_user_by_email(email).await?;
    let stored = found
        .as_ref()
        .and_then(|f| f.password_hash.as_deref().map(|hash| (f.user.id, hash)));

    let verified = match stored {
        Some((user_id, hash)) => verify_password(password, hash).await?.then_some(user_id),
        None => {
            state.password_decoy.verify(password).await?;
            None
        }
    };
    let user_id = verified.ok_or(AuthError::InvalidCredentials)?;

    let resp = start_session(state, user_id).await?;
    info!(user_id = %user_id, "user logged in");
    Ok(resp)
}

/// Sign in with a Google ID token, creating the account on first use.
pub async fn google_login(state: &AppState, credential: &str) -> AppResult<AuthResponse> {
    let credential = require("credential", Some(credential))?;
    let identity = state
        .identity
        .verify(credential, &state.config.google_client_id)
        .await?;

    let user = match state.store.find_user_by_email(&identity.email).await? {
        Some(existing) => existing.user,
        None => create_federated_user(state, identity).await?,
    };

    let resp = start_session(state, user.id).await?;
    info!(user_id = %user.id, "user logged in with google");
    Ok(resp)
}

async fn create_federated_user(state: &AppState, identity: FederatedIdentity) -> AppResult<User> {
    let avatar = match identity.picture.as_deref() {
        Some(url) => match state.media.store_remote(url).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "could not fetch federated avatar");
                String::new()
            }
        },
        None => String::new(),
    };

    let created = state
        .store
        .create_user(NewUser {
            email: identity.email.clone(),
            full_name: identity.name.unwrap_or_else(|| identity.email.clone()),
            avatar: avatar.clone(),
            password_hash: None,
        })
        .await;

    match created {
        Ok(user) => {
            info!(user_id = %user.id, "created account from federated identity");
            Ok(user)
        }
        // Another request created the account first.
        Err(StoreError::Conflict(_)) => {
            media::discard(state.media.as_ref(), &avatar).await;
            state
                .store
                .find_user_by_email(&identity.email)
                .await?
                .map(|found| found.user)
                .ok_or_else(|| AppError::Internal("federated account vanished after conflict".into()))
        }
        Err(e) => {
            media::discard(state.media.as_ref(), &avatar).await;
            Err(e.into())
        }
    }
}

/// Verify a refresh token and consume it. Every failure is the same 401.
async fn redeem_refresh_token(state: &AppState, refresh_token: &str) -> AppResult<Uuid> {
    let verified = state
        .tokens
        .verify_token(refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            debug!(error = %e, "refresh token rejected");
            invalid_refresh_token()
        })?;

    if state.store.find_user_by_id(verified.user_id).await?.is_none() {
        debug!(user_id = %verified.user_id, "refresh token for unknown user");
        return Err(invalid_refresh_token());
    }

    match consume_refresh_token(state.store.as_ref(), verified.user_id, refresh_token).await {
        Ok(()) => Ok(verified.user_id),
        Err(AuthError::RefreshTokenReuseDetected(_)) => Err(invalid_refresh_token()),
        Err(e) => Err(e.into()),
    }
}

/// Exchange a refresh token for a new pair. The presented token is spent.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let user_id = redeem_refresh_token(state, refresh_token).await?;
    let resp = start_session(state, user_id).await?;
    info!(%user_id, "session refreshed");
    Ok(resp)
}

/// Revoke exactly the presented refresh token.
pub async fn logout(state: &AppState, refresh_token: &str) -> AppResult<LogoutResponse> {
    let user_id = redeem_refresh_token(state, refresh_token).await?;
    info!(%user_id, "user logged out");
    Ok(LogoutResponse { success: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@@x.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }
}
