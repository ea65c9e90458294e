//! Posts, comments, likes and listing filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Upper bound on a requested page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Largest page size a comment listing accepts. Larger requests are refused.
pub const MAX_COMMENT_PAGE_LIMIT: u32 = 50;

/// A post with an attached image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    /// Creating user; never reassigned.
    pub author: Uuid,
    pub content: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: Uuid,
    pub content: String,
    pub image: String,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post: Uuid,
    /// Creating user; never reassigned.
    pub author: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post: Uuid,
    pub author: Uuid,
    pub content: String,
}

/// Like count for a post as seen by one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeSummary {
    pub likes: i64,
    pub liked_by_me: bool,
}

/// Allow-listed post listing filter.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author: Option<Uuid>,
}

/// Allow-listed comment listing filter.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post: Option<Uuid>,
    pub author: Option<Uuid>,
}

/// One-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Total number of pages needed for `total` rows.
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
