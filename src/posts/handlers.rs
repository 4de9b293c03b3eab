use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{ensure_allowed, Action, AuthenticatedUser};
use crate::db::{Comment, NewPost, Post, PostChanges};
use crate::error::AppError;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: Option<String>,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::PostNotFound)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn load(state: &AppState, id: Uuid) -> Result<Post, AppError> {
    state
        .posts
        .get_post(id)
        .await?
        .ok_or(AppError::PostNotFound)
}

pub async fn list_posts(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let posts = state.posts.list_posts().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(posts)))
}

pub async fn get_post(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = load(&state, parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(post)))
}

pub async fn create_post(
    user: AuthenticatedUser,
    req: web::Json<CreatePostRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let (Some(title), Some(content)) = (non_empty(req.title), non_empty(req.content)) else {
        return Err(AppError::ValidationError(
            "Title and content are required".to_string(),
        ));
    };

    let owner = user.identity().username.clone();
    let post = Post::new(
        owner,
        NewPost {
            title,
            content,
            tags: req.tags,
            image: req.image,
        },
    );
    let saved = state.posts.insert_post(&post).await?;
    info!(post_id = %saved.id, owner = %saved.owner, "Post created");

    Ok(HttpResponse::Created().json(ApiResponse::with_data("Post created successfully", saved)))
}

pub async fn update_post(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<PostChanges>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let changes = req.into_inner();
    let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&changes.title) || blank(&changes.content) {
        return Err(AppError::ValidationError(
            "Title and content cannot be empty".to_string(),
        ));
    }

    let post = load(&state, id).await?;
    ensure_allowed(user.identity(), &post.owner, Action::Update)?;

    // The store re-checks the owner in the same write, so a post deleted in
    // between comes back as not found rather than being resurrected.
    let updated = state
        .posts
        .update_post(id, &user.identity().username, changes)
        .await?
        .ok_or(AppError::PostNotFound)?;
    info!(post_id = %id, "Post updated");

    Ok(HttpResponse::Ok().json(ApiResponse::with_data("Post updated successfully", updated)))
}

pub async fn delete_post(
    user: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let post = load(&state, id).await?;
    ensure_allowed(user.identity(), &post.owner, Action::Delete)?;

    if !state.posts.delete_post(id, &user.identity().username).await? {
        return Err(AppError::PostNotFound);
    }
    info!(post_id = %id, "Post deleted");

    Ok(HttpResponse::Ok().json(ApiResponse::message("Post deleted successfully")))
}

pub async fn toggle_like(
    user: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let post = load(&state, id).await?;
    ensure_allowed(user.identity(), &post.owner, Action::Like)?;

    let updated = state
        .posts
        .toggle_like(id, &user.identity().username)
        .await?
        .ok_or(AppError::PostNotFound)?;

    let message = if updated.is_liked_by(&user.identity().username) {
        "Post liked"
    } else {
        "Post unliked"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::with_data(message, updated)))
}

pub async fn add_comment(
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<CommentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let Some(content) = non_empty(req.into_inner().content) else {
        return Err(AppError::ValidationError(
            "Comment content is required".to_string(),
        ));
    };

    let post = load(&state, id).await?;
    ensure_allowed(user.identity(), &post.owner, Action::Comment)?;

    let comment = Comment::new(user.identity().username.clone(), content);
    let updated = state
        .posts
        .add_comment(id, &comment)
        .await?
        .ok_or(AppError::PostNotFound)?;

    Ok(HttpResponse::Created().json(ApiResponse::with_data("Comment added", updated)))
}
