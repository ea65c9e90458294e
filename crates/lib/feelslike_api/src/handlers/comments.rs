//! Comment request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use feelslike_core::models::content::{
    Comment, CommentFilter, MAX_COMMENT_PAGE_LIMIT, NewComment, Page,
};
use feelslike_core::store::{CommentStore, Repository};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, require};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CommentListResponse, CommentQuery, CommentResponse, CreateCommentRequest,
    UpdateCommentRequest,
};
use crate::services::ownership::{delete_owned, load, load_owned};

/// `GET /comments` — newest first, filtered by `post` and/or `author`.
pub async fn list_comments_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> AppResult<Json<CommentListResponse>> {
    check_bounds(&query)?;
    let page = Page::new(query.page, query.limit);
    let filter = CommentFilter {
        post: query.post,
        author: query.author,
    };
    let (rows, total) = state.store.list_comments(&filter, page).await?;

    let has_more = page.offset() + (rows.len() as i64) < total;
    Ok(Json(CommentListResponse {
        items: rows.into_iter().map(CommentResponse::from).collect(),
        total,
        page: page.page,
        limit: page.limit,
        has_more,
    }))
}

fn check_bounds(query: &CommentQuery) -> AppResult<()> {
    let message = match (query.page, query.limit) {
        (Some(0), _) => "\"page\" must be greater than or equal to 1".to_string(),
        (_, Some(0)) => "\"limit\" must be greater than or equal to 1".to_string(),
        (_, Some(limit)) if limit > MAX_COMMENT_PAGE_LIMIT => {
            format!("\"limit\" must be less than or equal to {MAX_COMMENT_PAGE_LIMIT}")
        }
        _ => return Ok(()),
    };
    Err(AppError::Validation(message))
}

/// `POST /comments` — comment on an existing post.
pub async fn create_comment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let content = require("content", Some(body.content.as_str()))?.to_owned();
    let comment = state
        .store
        .create_comment(NewComment {
            post: body.post,
            author: user.0.id,
            content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// `GET /comments/{id}`
pub async fn get_comment_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<CommentResponse>> {
    let comment = load::<Comment, _>(state.store.as_ref(), id).await?;
    Ok(Json(comment.into()))
}

/// `PUT /comments/{id}` — owner only.
pub async fn update_comment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateCommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    let mut comment = load_owned::<Comment, _>(state.store.as_ref(), id, user.0.id).await?;
    comment.content = require("content", Some(body.content.as_str()))?.to_owned();
    let saved = Repository::<Comment>::save(state.store.as_ref(), &comment).await?;
    Ok(Json(saved.into()))
}

/// `DELETE /comments/{id}` — owner only.
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    delete_owned::<Comment, _>(state.store.as_ref(), id, user.0.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
