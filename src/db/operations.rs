use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{Comment, Post, PostChanges, User};
use crate::db::{PostStore, UserStore};
use crate::error::{AppError, DatabaseError};

const POST_COLUMNS: &str =
    "id, owner, title, content, tags, image, likes, comments, created_at, updated_at";

/// Postgres-backed store. Every post mutation is a single `UPDATE`/`DELETE`
/// statement, so per-document atomicity comes from the database.
pub struct DbOperations {
    pool: Arc<PgPool>,
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    owner: String,
    title: String,
    content: String,
    tags: Vec<String>,
    image: Option<String>,
    likes: Vec<String>,
    comments: Json<Vec<Comment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            owner: row.owner,
            title: row.title,
            content: row.content,
            tags: row.tags,
            image: row.image,
            likes: row.likes,
            comments: row.comments.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        // Primary key on username: a concurrent duplicate surfaces as a unique violation.
        sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl PostStore for DbOperations {
    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id",
            POST_COLUMNS
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Post::from))
    }

    async fn insert_post(&self, post: &Post) -> Result<Post, DatabaseError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {cols}
            "#,
            cols = POST_COLUMNS
        ))
        .bind(post.id)
        .bind(&post.owner)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .bind(&post.image)
        .bind(&post.likes)
        .bind(Json(&post.comments))
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn update_post(
        &self,
        id: Uuid,
        owner: &str,
        changes: PostChanges,
    ) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                tags = COALESCE($5, tags),
                image = COALESCE($6, image),
                updated_at = $7
            WHERE id = $1 AND owner = $2
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.tags)
        .bind(changes.image)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Post::from))
    }

    async fn delete_post(&self, id: Uuid, owner: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, id: Uuid, username: &str) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts SET
                likes = CASE WHEN $2 = ANY(likes)
                    THEN array_remove(likes, $2)
                    ELSE array_append(likes, $2)
                END,
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(username)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Post::from))
    }

    async fn add_comment(&self, id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts SET
                comments = comments || jsonb_build_array($2::jsonb),
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(Json(comment))
        .bind(comment.created_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Post::from))
    }
}
