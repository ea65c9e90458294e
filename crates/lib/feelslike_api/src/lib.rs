//! # feelslike_api
//!
//! HTTP API library for Feels Like.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use feelslike_core::auth::AuthError;
use feelslike_core::auth::federated::IdentityVerifier;
use feelslike_core::auth::password::DecoyHash;
use feelslike_core::auth::token::TokenService;
use feelslike_core::media::{MediaStore, UPLOADS_PREFIX};
use feelslike_core::store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, comments, health, likes, posts, users};

/// Largest request body accepted (multipart uploads included).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Users, posts, comments and likes.
    pub store: Arc<dyn Store>,
    /// Signs and verifies access/refresh tokens.
    pub tokens: Arc<TokenService>,
    /// Avatar and post image storage.
    pub media: Arc<dyn MediaStore>,
    /// Federated (Google) credential verification.
    pub identity: Arc<dyn IdentityVerifier>,
    /// Checked by logins that have no stored hash to verify.
    pub password_decoy: Arc<DecoyHash>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build state from its collaborators. Fails when the token
    /// configuration is unusable.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn Store>,
        media: Arc<dyn MediaStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, AuthError> {
        let tokens = TokenService::new(config.tokens.clone())?;
        Ok(Self {
            store,
            tokens: Arc::new(tokens),
            media,
            identity,
            password_decoy: Arc::new(DecoyHash::new(config.bcrypt_cost)),
            config,
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/google", post(auth::google_login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (require a valid access token)
    let protected = Router::new()
        .route("/auth/active", get(auth::active_handler))
        .route(
            "/posts",
            get(posts::list_posts_handler).post(posts::create_post_handler),
        )
        .route(
            "/posts/{id}",
            get(posts::get_post_handler)
                .put(posts::update_post_handler)
                .delete(posts::delete_post_handler),
        )
        .route("/posts/{id}/like", post(likes::like_post_handler))
        .route("/posts/{id}/unlike", delete(likes::unlike_post_handler))
        .route("/posts/{id}/likes", get(likes::get_likes_handler))
        .route(
            "/comments",
            get(comments::list_comments_handler).post(comments::create_comment_handler),
        )
        .route(
            "/comments/{id}",
            get(comments::get_comment_handler)
                .put(comments::update_comment_handler)
                .delete(comments::delete_comment_handler),
        )
        .route(
            "/users/{id}",
            get(users::get_user_handler).put(users::update_user_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let uploads = ServeDir::new(&state.config.uploads_dir);

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service(&format!("/{UPLOADS_PREFIX}"), uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
