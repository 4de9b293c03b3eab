use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{AuthenticatedUser, Identity};
use crate::db::User;
use crate::error::{AppError, AuthError};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn into_parts(self) -> Result<(String, String), AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(AppError::ValidationError(
                "Username and password required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: UserView,
    pub token: String,
}

impl AuthData {
    fn issue(state: &AppState, user: &User) -> Result<Self, AppError> {
        Ok(Self {
            user: UserView {
                username: user.username.clone(),
            },
            token: state.tokens.issue(&Identity::from(user))?,
        })
    }
}

pub async fn signup(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = req.into_inner().into_parts()?;
    info!("Received signup request for username: {}", username);

    let user = match state.credentials.register(&username, &password).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Signup failed for username: {}: {}", username, e);
            return Err(e);
        }
    };

    info!("Signup successful for username: {}", username);
    Ok(HttpResponse::Ok().json(ApiResponse::with_data(
        "User created successfully",
        AuthData::issue(&state, &user)?,
    )))
}

pub async fn login(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = req.into_inner().into_parts()?;
    info!("Received login request for username: {}", username);

    match state.credentials.verify(&username, &password).await {
        Ok(user) => {
            info!("Login successful for username: {}", username);
            Ok(HttpResponse::Ok().json(ApiResponse::with_data(
                "Login successful",
                AuthData::issue(&state, &user)?,
            )))
        }
        Err(e) => {
            warn!("Login failed for username: {}: {}", username, e);
            Err(e)
        }
    }
}

/// Confirms that the presented token still names a registered user.
pub async fn me(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let record = state
        .credentials
        .find(&user.identity().username)
        .await?
        // Token verified but the user is gone: treat the token as stale.
        .ok_or(AuthError::InvalidToken)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "user": {
                "username": record.username,
                "createdAt": record.created_at,
            }
        }
    })))
}
