//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, MultipartForm};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ActiveResponse, AuthResponse, GoogleLoginRequest, LoginRequest, LogoutResponse,
    RefreshTokenRequest,
};
use crate::services::auth;

/// `POST /auth/signup` — create an account from a multipart form
/// (`email`, `password`, `fullName`, `avatar` file).
pub async fn signup_handler(
    State(state): State<AppState>,
    form: MultipartForm,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let resp = auth::signup(&state, form).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let resp = auth::login(&state, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/google` — authenticate with a Google ID token.
pub async fn google_login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GoogleLoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let resp = auth::google_login(&state, &body.credential).await?;
    Ok(Json(resp))
}

/// `POST /auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> AppResult<Json<AuthResponse>> {
    let resp = auth::refresh(&state, &body.refresh_token).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — revoke a refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> AppResult<Json<LogoutResponse>> {
    let resp = auth::logout(&state, &body.refresh_token).await?;
    Ok(Json(resp))
}

/// `GET /auth/active` — echo the authenticated user's id.
pub async fn active_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ActiveResponse> {
    Json(ActiveResponse { user_id: user.0.id })
}
