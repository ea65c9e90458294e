//! In-memory store.
//!
//! Used by the test suites and by `feelslike_api_server --memory`. All data is
//! lost when the process exits. Each user record sits behind its own
//! `DashMap` shard lock, so refresh-token list mutations are atomic per user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{
    CommentStore, LikeStore, MAX_REFRESH_TOKENS_PER_USER, PostStore, Repository, StoreError,
    StoreResult, UserStore,
};
use crate::models::auth::{NewUser, User, UserWithPassword};
use crate::models::content::{
    Comment, CommentFilter, LikeSummary, NewComment, NewPost, Page, Post, PostFilter,
};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: Option<String>,
    refresh_tokens: Vec<String>,
}

/// Thread-safe in-memory store. Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<Uuid, UserRecord>>,
    emails: Arc<DashMap<String, Uuid>>,
    posts: Arc<DashMap<Uuid, Post>>,
    comments: Arc<DashMap<Uuid, Comment>>,
    likes: Arc<DashMap<(Uuid, Uuid), chrono::DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the refresh-token digests a user currently holds.
    pub fn refresh_token_digests(&self, id: Uuid) -> Vec<String> {
        self.users
            .get(&id)
            .map(|r| r.refresh_tokens.clone())
            .unwrap_or_default()
    }
}

/// Newest first, then one page of the result.
fn paginate<T: Clone>(
    mut rows: Vec<T>,
    page: Page,
    key: impl Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
) -> (Vec<T>, i64) {
    rows.sort_by_key(|r| std::cmp::Reverse(key(r)));
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        let Some(id) = self.emails.get(email).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| UserWithPassword {
            user: r.user.clone(),
            password_hash: r.password_hash.clone(),
        }))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|r| r.user.clone()))
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        // The email entry is held while the user is inserted, so two
        // concurrent signups for one email cannot both succeed.
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("Email already in use".into())),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email,
                    full_name: new_user.full_name,
                    avatar: new_user.avatar,
                };
                self.users.insert(
                    user.id,
                    UserRecord {
                        user: user.clone(),
                        password_hash: new_user.password_hash,
                        refresh_tokens: Vec::new(),
                    },
                );
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        avatar: Option<&str>,
    ) -> StoreResult<User> {
        let mut record = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User not found".into()))?;
        record.user.full_name = full_name.to_string();
        if let Some(avatar) = avatar {
            record.user.avatar = avatar.to_string();
        }
        Ok(record.user.clone())
    }

    async fn push_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<()> {
        let mut record = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User not found".into()))?;
        record.refresh_tokens.push(digest.to_string());
        let excess = record
            .refresh_tokens
            .len()
            .saturating_sub(MAX_REFRESH_TOKENS_PER_USER);
        record.refresh_tokens.drain(..excess);
        Ok(())
    }

    async fn take_refresh_token(&self, id: Uuid, digest: &str) -> StoreResult<bool> {
        let Some(mut record) = self.users.get_mut(&id) else {
            return Ok(false);
        };
        match record.refresh_tokens.iter().position(|t| t == digest) {
            Some(pos) => {
                record.refresh_tokens.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_refresh_tokens(&self, id: Uuid) -> StoreResult<()> {
        if let Some(mut record) = self.users.get_mut(&id) {
            record.refresh_tokens.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Post> for MemoryStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn save(&self, post: &Post) -> StoreResult<Post> {
        let mut stored = self
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StoreError::NotFound("Post not found".into()))?;
        stored.content = post.content.clone();
        stored.image = post.image.clone();
        Ok(stored.clone())
    }

    async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        if self.posts.remove(&id).is_none() {
            return Ok(false);
        }
        self.comments.retain(|_, c| c.post != id);
        self.likes.retain(|(post, _), _| *post != id);
        Ok(true)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post> {
        if !self.users.contains_key(&new_post.author) {
            return Err(StoreError::NotFound(format!(
                "User \"{}\" not found",
                new_post.author
            )));
        }
        let post = Post {
            id: Uuid::now_v7(),
            author: new_post.author,
            content: new_post.content,
            image: new_post.image,
            created_at: Utc::now(),
        };
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn list_posts(&self, filter: &PostFilter, page: Page) -> StoreResult<(Vec<Post>, i64)> {
        let rows = self
            .posts
            .iter()
            .filter(|p| filter.author.is_none_or(|a| p.author == a))
            .map(|p| p.clone())
            .collect();
        Ok(paginate(rows, page, |p: &Post| (p.created_at, p.id)))
    }
}

#[async_trait]
impl Repository<Comment> for MemoryStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn save(&self, comment: &Comment) -> StoreResult<Comment> {
        let mut stored = self
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| StoreError::NotFound("Comment not found".into()))?;
        stored.content = comment.content.clone();
        Ok(stored.clone())
    }

    async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.comments.remove(&id).is_some())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        if !self.posts.contains_key(&new_comment.post) {
            return Err(StoreError::NotFound("Post not found".into()));
        }
        let comment = Comment {
            id: Uuid::now_v7(),
            post: new_comment.post,
            author: new_comment.author,
            content: new_comment.content,
            created_at: Utc::now(),
        };
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<(Vec<Comment>, i64)> {
        let rows = self
            .comments
            .iter()
            .filter(|c| filter.post.is_none_or(|p| c.post == p))
            .filter(|c| filter.author.is_none_or(|a| c.author == a))
            .map(|c| c.clone())
            .collect();
        Ok(paginate(rows, page, |c: &Comment| (c.created_at, c.id)))
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn add_like(&self, post: Uuid, user: Uuid) -> StoreResult<()> {
        if !self.posts.contains_key(&post) {
            return Err(StoreError::NotFound("Post not found".into()));
        }
        match self.likes.entry((post, user)) {
            Entry::Occupied(_) => Err(StoreError::Conflict("Duplicate like".into())),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(())
            }
        }
    }

    async fn remove_like(&self, post: Uuid, user: Uuid) -> StoreResult<bool> {
        Ok(self.likes.remove(&(post, user)).is_some())
    }

    async fn like_summary(&self, post: Uuid, viewer: Uuid) -> StoreResult<LikeSummary> {
        let likes = self.likes.iter().filter(|e| e.key().0 == post).count() as i64;
        Ok(LikeSummary {
            likes,
            liked_by_me: self.likes.contains_key(&(post, viewer)),
        })
    }
}
