//! User profile request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use feelslike_core::store::UserStore;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, MultipartForm};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::UserResponse;
use crate::services::media;
use crate::services::ownership::assert_owner;

/// `GET /users/{id}` — public profile fields.
pub async fn get_user_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}

/// `PUT /users/{id}` — update your own `fullName` and optionally `avatar`.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    mut form: MultipartForm,
) -> AppResult<Json<UserResponse>> {
    let current = assert_owner(state.store.find_user_by_id(id).await?, caller.0.id)?;
    let full_name = form.required("fullName")?.to_owned();

    let avatar = match form.take_file("avatar") {
        Some(upload) => Some(media::store_form_upload(state.media.as_ref(), &upload).await?),
        None => None,
    };

    let updated = match state
        .store
        .update_profile(id, &full_name, avatar.as_deref())
        .await
    {
        Ok(user) => user,
        Err(e) => {
            if let Some(path) = &avatar {
                media::discard(state.media.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };

    if avatar.is_some() {
        media::discard(state.media.as_ref(), &current.avatar).await;
    }

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}
