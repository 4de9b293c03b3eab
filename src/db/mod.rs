//! Storage for identities and posts.
//!
//! Handlers and the credential store only see the [`UserStore`] and
//! [`PostStore`] traits; `DbOperations` backs them with Postgres and
//! `MemoryStore` keeps everything in process.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{Comment, NewPost, Post, PostChanges, User};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails with [`DatabaseError::Duplicate`] if the
    /// username is taken; the check and the write are one atomic step.
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_user(&self, username: &str) -> Result<Option<User>, DatabaseError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError>;

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError>;

    async fn insert_post(&self, post: &Post) -> Result<Post, DatabaseError>;

    /// Applies `changes` only if the post still belongs to `owner`.
    /// Returns `None` when no such post exists for that owner.
    async fn update_post(
        &self,
        id: Uuid,
        owner: &str,
        changes: PostChanges,
    ) -> Result<Option<Post>, DatabaseError>;

    /// Deletes the post only if it belongs to `owner`. Returns whether a row went away.
    async fn delete_post(&self, id: Uuid, owner: &str) -> Result<bool, DatabaseError>;

    /// Adds `username` to the likes set, or removes it if already present.
    async fn toggle_like(&self, id: Uuid, username: &str) -> Result<Option<Post>, DatabaseError>;

    async fn add_comment(&self, id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError>;
}
