//! Request handlers.

pub mod auth;
pub mod comments;
pub mod health;
pub mod likes;
pub mod posts;
pub mod users;
