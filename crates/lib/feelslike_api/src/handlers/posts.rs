//! Post request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use feelslike_core::models::content::{LikeSummary, NewPost, Page, Post, PostFilter};
use feelslike_core::store::{LikeStore, PostStore, Repository};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, MultipartForm};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{PostListResponse, PostQuery, PostResponse};
use crate::services::media;
use crate::services::ownership::{delete_owned, load, load_owned};

async fn with_likes(state: &AppState, post: Post, viewer: Uuid) -> AppResult<PostResponse> {
    let summary = state.store.like_summary(post.id, viewer).await?;
    Ok(PostResponse::new(post, summary))
}

/// `GET /posts` — newest first, optionally filtered by author.
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> AppResult<Json<PostListResponse>> {
    let page = Page::new(query.page, query.limit);
    let filter = PostFilter {
        author: query.author,
    };
    let (rows, total) = state.store.list_posts(&filter, page).await?;

    let mut posts = Vec::with_capacity(rows.len());
    for post in rows {
        posts.push(with_likes(&state, post, user.0.id).await?);
    }

    Ok(Json(PostListResponse {
        posts,
        current_page: page.page,
        total_pages: page.total_pages(total),
    }))
}

/// `POST /posts` — multipart `content` plus an `image` file.
pub async fn create_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut form: MultipartForm,
) -> AppResult<(StatusCode, Json<PostResponse>)> {
    let content = form.required("content")?.to_owned();
    let upload = form
        .take_file("image")
        .ok_or_else(|| AppError::Validation("Image is required".into()))?;

    let image = media::store_form_upload(state.media.as_ref(), &upload).await?;
    let post = match state
        .store
        .create_post(NewPost {
            author: user.0.id,
            content,
            image: image.clone(),
        })
        .await
    {
        Ok(post) => post,
        Err(e) => {
            media::discard(state.media.as_ref(), &image).await;
            return Err(e.into());
        }
    };

    info!(post_id = %post.id, author = %post.author, "post created");
    Ok((
        StatusCode::CREATED,
        Json(PostResponse::new(post, LikeSummary::default())),
    ))
}

/// `GET /posts/{id}`
pub async fn get_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PostResponse>> {
    let post = load::<Post, _>(state.store.as_ref(), id).await?;
    Ok(Json(with_likes(&state, post, user.0.id).await?))
}

/// `PUT /posts/{id}` — owner only. A new `image` file replaces the old one.
pub async fn update_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    mut form: MultipartForm,
) -> AppResult<Json<PostResponse>> {
    let mut post = load_owned::<Post, _>(state.store.as_ref(), id, user.0.id).await?;
    post.content = form.required("content")?.to_owned();

    let replaced = match form.take_file("image") {
        Some(upload) => {
            let image = media::store_form_upload(state.media.as_ref(), &upload).await?;
            Some(std::mem::replace(&mut post.image, image))
        }
        None => None,
    };

    let saved = match Repository::<Post>::save(state.store.as_ref(), &post).await {
        Ok(saved) => saved,
        Err(e) => {
            if replaced.is_some() {
                media::discard(state.media.as_ref(), &post.image).await;
            }
            return Err(e.into());
        }
    };

    if let Some(old) = replaced {
        media::discard(state.media.as_ref(), &old).await;
    }

    Ok(Json(with_likes(&state, saved, user.0.id).await?))
}

/// `DELETE /posts/{id}` — owner only. Removes the image file too.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    let post = delete_owned::<Post, _>(state.store.as_ref(), id, user.0.id).await?;
    media::discard(state.media.as_ref(), &post.image).await;
    info!(post_id = %post.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
