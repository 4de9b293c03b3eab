use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Comment, Post, PostChanges, User};
use crate::db::{PostStore, UserStore};
use crate::error::DatabaseError;

/// In-process store used when no database URL is configured, and by tests.
/// Every mutation of a single post happens under one write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        match users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(DatabaseError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(username).cloned())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let mut posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        // Newest first; ties on the timestamp fall back to id.
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(posts)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn insert_post(&self, post: &Post) -> Result<Post, DatabaseError> {
        let mut posts = self.posts.write().await;
        match posts.entry(post.id) {
            Entry::Occupied(_) => Err(DatabaseError::Duplicate),
            Entry::Vacant(slot) => Ok(slot.insert(post.clone()).clone()),
        }
    }

    async fn update_post(
        &self,
        id: Uuid,
        owner: &str,
        changes: PostChanges,
    ) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;
        Ok(posts
            .get_mut(&id)
            .filter(|post| post.owner == owner)
            .map(|post| {
                post.apply(changes);
                post.clone()
            }))
    }

    async fn delete_post(&self, id: Uuid, owner: &str) -> Result<bool, DatabaseError> {
        let mut posts = self.posts.write().await;
        match posts.get(&id) {
            Some(post) if post.owner == owner => {
                posts.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn toggle_like(&self, id: Uuid, username: &str) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| {
            post.toggle_like(username);
            post.clone()
        }))
    }

    async fn add_comment(&self, id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| {
            post.comments.push(comment.clone());
            post.updated_at = comment.created_at;
            post.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewPost;
    use std::sync::Arc;

    fn post_by(owner: &str, title: &str) -> Post {
        Post::new(
            owner.to_string(),
            NewPost {
                title: title.to_string(),
                content: "body".to_string(),
                tags: Vec::new(),
                image: None,
            },
        )
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&User::new("alice".into(), "h1".into())).await.unwrap();

        let second = store.insert_user(&User::new("alice".into(), "h2".into())).await;
        assert!(matches!(second, Err(DatabaseError::Duplicate)));

        let kept = store.find_user("alice").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "h1");
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_user(&User::new("race".into(), format!("h{}", i))).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStore::new();
        let mut older = post_by("bob", "older");
        older.created_at = older.created_at - chrono::Duration::minutes(5);
        store.insert_post(&older).await.unwrap();
        store.insert_post(&post_by("bob", "newer")).await.unwrap();

        let titles: Vec<String> = store.list_posts().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["newer".to_string(), "older".to_string()]);
    }

    #[tokio::test]
    async fn test_list_order_stable_on_equal_timestamps() {
        let store = MemoryStore::new();
        let first = post_by("bob", "a");
        let mut ids = vec![first.id];
        store.insert_post(&first).await.unwrap();
        for title in ["b", "c", "d", "e"] {
            let mut post = post_by("bob", title);
            post.created_at = first.created_at;
            ids.push(post.id);
            store.insert_post(&post).await.unwrap();
        }
        ids.sort();

        for _ in 0..3 {
            let listed: Vec<Uuid> = store.list_posts().await.unwrap().into_iter().map(|p| p.id).collect();
            assert_eq!(listed, ids);
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_check_owner() {
        let store = MemoryStore::new();
        let post = store.insert_post(&post_by("bob", "mine")).await.unwrap();

        let changes = PostChanges { title: Some("stolen".into()), ..Default::default() };
        assert!(store.update_post(post.id, "alice", changes).await.unwrap().is_none());
        assert!(!store.delete_post(post.id, "alice").await.unwrap());

        let stored = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "mine");

        assert!(store.delete_post(post.id, "bob").await.unwrap());
        assert!(store.get_post(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_like_and_comment() {
        let store = MemoryStore::new();
        let post = store.insert_post(&post_by("bob", "likeable")).await.unwrap();

        let liked = store.toggle_like(post.id, "alice").await.unwrap().unwrap();
        assert_eq!(liked.likes, vec!["alice".to_string()]);
        let unliked = store.toggle_like(post.id, "alice").await.unwrap().unwrap();
        assert!(unliked.likes.is_empty());

        let comment = Comment::new("alice".into(), "first".into());
        let commented = store.add_comment(post.id, &comment).await.unwrap().unwrap();
        assert_eq!(commented.comments, vec![comment]);

        assert!(store.toggle_like(Uuid::new_v4(), "alice").await.unwrap().is_none());
    }
}
