//! Persistence traits for users, posts, comments and likes.
//!
//! Two implementations live here: [`PgStore`] backed by PostgreSQL through
//! `sqlx`, and [`MemoryStore`] used by tests and database-less runs. Both
//! keep each user's refresh-token list inside the user record so that
//! [`UserStore::take_refresh_token`] is a single atomic update.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{NewUser, User, UserWithPassword};
use crate::models::content::{
    Comment, CommentFilter, LikeSummary, NewComment, NewPost, Page, Post, PostFilter,
};

/// Outstanding refresh tokens kept per user. Pushing past this drops the
/// oldest digest, which ends that session.
pub const MAX_REFRESH_TOKENS_PER_USER: usize = 20;

/// PostgreSQL SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Db(sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => {
                    return StoreError::Conflict(format!("Duplicate key: {}", db.message()));
                }
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return StoreError::NotFound(format!(
                        "Referenced record not found: {}",
                        db.message()
                    ));
                }
                _ => {}
            }
        }
        StoreError::Db(e)
    }
}

/// User records and their outstanding refresh tokens.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user (with password hash) by exact email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>>;

    /// Fetch a user by ID.
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Create a user. Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Replace a user's name and, when given, avatar.
    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        avatar: Option<&str>,
    ) -> StoreResult<User>;

    /// Append a refresh-token digest to the user's list, keeping only the
    /// newest [`MAX_REFRESH_TOKENS_PER_USER`].
    async fn push_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<()>;

    /// Atomically remove a refresh-token digest. Returns `false` when the
    /// digest was not in the list (or the user does not exist).
    async fn take_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool>;

    /// Drop every refresh token the user holds.
    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<()>;
}

/// Load, save and remove for an owned resource type.
///
/// The ownership guard in `feelslike_api` is written once against this trait
/// and reused for every resource kind.
#[async_trait]
pub trait Repository<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    async fn find(&self, id: Uuid) -> StoreResult<Option<R>>;

    /// Persist the mutable fields of an existing record.
    async fn save(&self, record: &R) -> StoreResult<R>;

    /// Remove a record. Returns `false` when it did not exist.
    async fn remove(&self, id: Uuid) -> StoreResult<bool>;
}

/// Post creation and listing.
#[async_trait]
pub trait PostStore: Repository<Post> {
    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post>;

    /// Posts newest first, with the total matching count.
    async fn list_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, i64)>;
}

/// Comment creation and listing.
#[async_trait]
pub trait CommentStore: Repository<Comment> {
    /// Fails with [`StoreError::NotFound`] when the post does not exist.
    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment>;

    /// Comments newest first, with the total matching count.
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<(Vec<Comment>, i64)>;
}

/// Likes, unique per (post, user).
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] on a duplicate like.
    async fn add_like(&self, post: Uuid, user: Uuid) -> StoreResult<()>;

    /// Returns `false` when no such like existed.
    async fn remove_like(&self, post: Uuid, user: Uuid) -> StoreResult<bool>;

    async fn like_summary(&self, post: Uuid, viewer: Uuid) -> StoreResult<LikeSummary>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: UserStore + PostStore + CommentStore + LikeStore {}

impl<T> Store for T where T: UserStore + PostStore + CommentStore + LikeStore {}
