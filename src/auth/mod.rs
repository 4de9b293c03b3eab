//! Authentication module for the blog server
//!
//! Credential storage, token issuance and verification, the request-level
//! gate that resolves the caller, and the ownership rule for posts.

mod credentials;
pub mod guard;
pub mod handlers;
mod middleware;
mod token;

use serde::{Deserialize, Serialize};

pub use credentials::CredentialStore;
pub use guard::{authorize, ensure_allowed, Action, Decision};
pub use middleware::AuthenticatedUser;
pub use token::{Claims, TokenService};

/// A resolved caller. Usernames are the identity key and compare exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl From<&crate::db::User> for Identity {
    fn from(user: &crate::db::User) -> Self {
        Identity::new(user.username.clone())
    }
}
