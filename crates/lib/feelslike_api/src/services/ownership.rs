//! Ownership guard shared by every mutable resource.
//!
//! A resource that exists but belongs to someone else is `Forbidden`; one
//! that does not exist is `NotFound`. The check is written once over
//! [`OwnedResource`] and works against any [`Repository`].

use feelslike_core::models::auth::User;
use feelslike_core::models::content::{Comment, Post};
use feelslike_core::store::Repository;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A record with a single owning user.
pub trait OwnedResource: Send + Sync + 'static {
    /// Label used in "not found" messages.
    const KIND: &'static str;

    /// Message returned to a caller who does not own the record.
    const FORBIDDEN: &'static str = "Action not allowed";

    fn owner(&self) -> Uuid;
}

impl OwnedResource for Post {
    const KIND: &'static str = "Post";

    fn owner(&self) -> Uuid {
        self.author
    }
}

impl OwnedResource for Comment {
    const KIND: &'static str = "Comment";

    fn owner(&self) -> Uuid {
        self.author
    }
}

/// A profile is owned by the user it describes.
impl OwnedResource for User {
    const KIND: &'static str = "User";
    const FORBIDDEN: &'static str = "Not authorized to update this user";

    fn owner(&self) -> Uuid {
        self.id
    }
}

/// `NotFound` when absent, `Forbidden` when `caller` is not the owner.
pub fn assert_owner<R: OwnedResource>(resource: Option<R>, caller: Uuid) -> AppResult<R> {
    let resource = resource.ok_or_else(|| not_found::<R>())?;
    if resource.owner() != caller {
        return Err(AppError::Forbidden(R::FORBIDDEN.into()));
    }
    Ok(resource)
}

/// Load a record by id, failing with `NotFound`.
pub async fn load<R, S>(store: &S, id: Uuid) -> AppResult<R>
where
    R: OwnedResource,
    S: Repository<R> + ?Sized,
{
    store.find(id).await?.ok_or_else(|| not_found::<R>())
}

/// Load a record the caller owns.
pub async fn load_owned<R, S>(store: &S, id: Uuid, caller: Uuid) -> AppResult<R>
where
    R: OwnedResource,
    S: Repository<R> + ?Sized,
{
    assert_owner(store.find(id).await?, caller)
}

/// Delete a record the caller owns, returning it for follow-up cleanup.
pub async fn delete_owned<R, S>(store: &S, id: Uuid, caller: Uuid) -> AppResult<R>
where
    R: OwnedResource,
    S: Repository<R> + ?Sized,
{
    let resource = load_owned(store, id, caller).await?;
    if !store.remove(id).await? {
        // Removed concurrently between the load and the delete.
        return Err(not_found::<R>());
    }
    Ok(resource)
}

fn not_found<R: OwnedResource>() -> AppError {
    AppError::NotFound(format!("{} not found", R::KIND))
}
