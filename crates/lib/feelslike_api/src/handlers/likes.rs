//! Like request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use feelslike_core::store::{LikeStore, StoreError};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiPath;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LikesResponse, MessageResponse};

/// `POST /posts/{id}/like` — at most one like per user and post.
pub async fn like_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post): ApiPath<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state
        .store
        .add_like(post, user.0.id)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::Conflict("You have already liked this post".into())
            }
            StoreError::NotFound(_) => AppError::NotFound("Post not found".into()),
            other => other.into(),
        })?;

    debug!(post_id = %post, user_id = %user.0.id, "post liked");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Post liked successfully".into(),
        }),
    ))
}

/// `DELETE /posts/{id}/unlike`
pub async fn unlike_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !state.store.remove_like(post, user.0.id).await? {
        return Err(AppError::NotFound("Like not found".into()));
    }
    Ok(Json(MessageResponse {
        message: "Post unliked successfully".into(),
    }))
}

/// `GET /posts/{id}/likes` — count and whether the caller is among them.
pub async fn get_likes_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(post): ApiPath<Uuid>,
) -> AppResult<Json<LikesResponse>> {
    let summary = state.store.like_summary(post, user.0.id).await?;
    Ok(Json(LikesResponse {
        likes: summary.likes,
        liked_by_me: summary.liked_by_me,
    }))
}
