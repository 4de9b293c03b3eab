use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: String, content: String) -> Self {
        Self {
            author,
            content,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    /// Username of the creator. Set once, never rewritten.
    #[serde(rename = "username")]
    pub owner: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(owner: String, new_post: NewPost) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            title: new_post.title,
            content: new_post.content,
            tags: new_post.tags,
            image: new_post.image,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, username: &str) -> bool {
        self.likes.iter().any(|u| u == username)
    }

    /// Flips `username`'s membership in the likes set.
    pub fn toggle_like(&mut self, username: &str) {
        if self.is_liked_by(username) {
            self.likes.retain(|u| u != username);
        } else {
            self.likes.push(username.to_string());
        }
        self.updated_at = Utc::now();
    }

    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(tags) = changes.tags {
            self.tags = tags;
        }
        if let Some(image) = changes.image {
            self.image = Some(image);
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial update of a post's mutable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}
