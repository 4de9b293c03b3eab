//! Single decision point for who may do what to a post.

use crate::auth::Identity;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
    Like,
    Comment,
}

impl Action {
    fn requires_ownership(self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }

    fn verb(self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Like => "like",
            Action::Comment => "comment on",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Update and delete are reserved to the owner; liking and commenting are open
/// to any authenticated identity. Usernames compare byte for byte.
pub fn authorize(actor: &Identity, owner: &str, action: Action) -> Decision {
    if !action.requires_ownership() || actor.username == owner {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// [`authorize`], with a denial turned into a 403.
pub fn ensure_allowed(actor: &Identity, owner: &str, action: Action) -> Result<(), AppError> {
    match authorize(actor, owner, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AppError::Forbidden(format!(
            "You can only {} your own posts",
            action.verb()
        ))),
    }
}
