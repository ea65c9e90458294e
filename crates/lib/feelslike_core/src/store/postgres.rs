//! PostgreSQL-backed store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

use super::{
    CommentStore, LikeStore, MAX_REFRESH_TOKENS_PER_USER, PostStore, Repository, StoreError,
    StoreResult, UserStore,
};
use crate::models::auth::{NewUser, User, UserWithPassword};
use crate::models::content::{
    Comment, CommentFilter, LikeSummary, NewComment, NewPost, Page, Post, PostFilter,
};

/// Row returned by credential lookups.
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    full_name: String,
    avatar: String,
    password_hash: Option<String>,
}

/// Store over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(StoreError::Db)?;
        Ok(Self::new(pool))
    }

    /// Run the migrations embedded from `feelslike_core/migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, email, full_name, avatar, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserWithPassword {
            user: User {
                id: r.id,
                email: r.email,
                full_name: r.full_name,
                avatar: r.avatar,
            },
            password_hash: r.password_hash,
        }))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, avatar FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, full_name, avatar, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, email, full_name, avatar",
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.avatar)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => StoreError::Conflict("Email already in use".into()),
            other => other,
        })?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        avatar: Option<&str>,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET full_name = $2, avatar = COALESCE($3, avatar) \
             WHERE id = $1 \
             RETURNING id, email, full_name, avatar",
        )
        .bind(id)
        .bind(full_name)
        .bind(avatar)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or_else(|| StoreError::NotFound("User not found".into()))
    }

    async fn push_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET refresh_tokens = \
                 (array_append(refresh_tokens, $2))\
                 [GREATEST(cardinality(refresh_tokens) + 2 - $3, 1):] \
             WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .bind(MAX_REFRESH_TOKENS_PER_USER as i32)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn take_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool> {
        // Single statement: the row lock makes concurrent takes of the same
        // digest serialize, and only the first sees it in the array.
        let taken = sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET refresh_tokens = array_remove(refresh_tokens, $2) \
             WHERE id = $1 AND $2 = ANY(refresh_tokens) \
             RETURNING id",
        )
        .bind(id)
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(taken.is_some())
    }

    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET refresh_tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[async_trait]
impl Repository<Post> for PgStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            "SELECT id, author, content, image, created_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn save(&self, post: &Post) -> StoreResult<Post> {
        let saved = sqlx::query_as::<_, Post>(
            "UPDATE posts SET content = $2, image = $3 WHERE id = $1 \
             RETURNING id, author, content, image, created_at",
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(&post.image)
        .fetch_optional(&self.pool)
        .await?;
        saved.ok_or_else(|| StoreError::NotFound("Post not found".into()))
    }

    async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (id, author, content, image) VALUES ($1, $2, $3, $4) \
             RETURNING id, author, content, image, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(new_post.author)
        .bind(&new_post.content)
        .bind(&new_post.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn list_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR author = $1)",
        )
        .bind(filter.author)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author, content, image, created_at
            FROM posts
            WHERE ($1::uuid IS NULL OR author = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.author)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[async_trait]
impl Repository<Comment> for PgStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, post, author, content, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn save(&self, comment: &Comment) -> StoreResult<Comment> {
        let saved = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2 WHERE id = $1 \
             RETURNING id, post, author, content, created_at",
        )
        .bind(comment.id)
        .bind(&comment.content)
        .fetch_optional(&self.pool)
        .await?;
        saved.ok_or_else(|| StoreError::NotFound("Comment not found".into()))
    }

    async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, post, author, content) VALUES ($1, $2, $3, $4) \
             RETURNING id, post, author, content, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(new_comment.post)
        .bind(new_comment.author)
        .bind(&new_comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::NotFound(_) => StoreError::NotFound("Post not found".into()),
            other => other,
        })?;
        Ok(comment)
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<(Vec<Comment>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments \
             WHERE ($1::uuid IS NULL OR post = $1) AND ($2::uuid IS NULL OR author = $2)",
        )
        .bind(filter.post)
        .bind(filter.author)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post, author, content, created_at
            FROM comments
            WHERE ($1::uuid IS NULL OR post = $1) AND ($2::uuid IS NULL OR author = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.post)
        .bind(filter.author)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

#[async_trait]
impl LikeStore for PgStore {
    async fn add_like(&self, post: Uuid, user: Uuid) -> StoreResult<()> {
        sqlx::query("INSERT INTO likes (post, user_id) VALUES ($1, $2)")
            .bind(post)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_like(&self, post: Uuid, user: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE post = $1 AND user_id = $2")
            .bind(post)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn like_summary(&self, post: Uuid, viewer: Uuid) -> StoreResult<LikeSummary> {
        let (likes, liked_by_me) = sqlx::query_as::<_, (i64, bool)>(
            "SELECT COUNT(*), COALESCE(BOOL_OR(user_id = $2), false) FROM likes WHERE post = $1",
        )
        .bind(post)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;
        Ok(LikeSummary { likes, liked_by_me })
    }
}
