use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::debug;

use crate::db::{User, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};

/// Registers and verifies username/password identities on top of a [`UserStore`].
///
/// Passwords are stored as Argon2id PHC strings with a per-user random salt.
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    // Verified against when the username is unknown so both login failures
    // cost one Argon2 run. Hashed once in `new`.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Result<Self, AppError> {
        Ok(Self {
            users,
            dummy_hash: hash_password("not-a-real-password")?,
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password required".to_string(),
            ));
        }

        let user = User::new(username.to_string(), hash_password(password)?);
        match self.users.insert_user(&user).await {
            Ok(()) => Ok(user),
            Err(DatabaseError::Duplicate) => Err(AuthError::DuplicateIdentity.into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.users.find_user(username).await? else {
            let _ = verify_password(password, &self.dummy_hash);
            debug!("Credential check for unknown user");
            return Err(AuthError::UnknownUser.into());
        };

        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }

    pub async fn find(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_user(username).await?)
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
