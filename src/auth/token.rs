use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Username
    pub iat: i64,     // Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Issues and verifies HS256 identity tokens.
///
/// The secret is injected at construction and never changes for the life of
/// the service; rotating it means building a new service, which invalidates
/// every outstanding token at once.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: Option<Duration>,
}

impl TokenService {
    /// Fails if `secret` is blank. There is no fallback secret.
    pub fn new(secret: &str, max_age_secs: Option<i64>) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::ConfigError(
                "auth.jwt_secret must be set to a non-empty value".to_string(),
            ));
        }
        let max_age = max_age_secs.map(max_age_from_secs).transpose()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            max_age,
        })
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        self.issue_at(identity, Utc::now())
    }

    /// Same claims and secret always produce the same token.
    pub fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let exp = match self.max_age {
            Some(age) => Some(
                issued_at
                    .checked_add_signed(age)
                    .ok_or_else(|| AppError::InternalError("Token expiry out of range".to_string()))?
                    .timestamp(),
            ),
            None => None,
        };
        let claims = Claims {
            sub: identity.username.clone(),
            iat: issued_at.timestamp(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is enforced from `iat` below so that tokens issued before
        // expiry was switched on are covered too.
        validation.set_required_spec_claims(&["sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if let Some(max_age) = self.max_age {
            if data.claims.iat.saturating_add(max_age.num_seconds()) <= Utc::now().timestamp() {
                return Err(AuthError::TokenExpired);
            }
        }

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity::new(data.claims.sub))
    }
}

/// Positive, and small enough that a token issued now has a representable expiry.
fn max_age_from_secs(secs: i64) -> Result<Duration, AppError> {
    let out_of_range = || {
        AppError::ConfigError(format!(
            "auth.token_max_age_secs must be positive and within range, got {}",
            secs
        ))
    };
    if secs <= 0 {
        return Err(out_of_range());
    }
    let age = Duration::try_seconds(secs).ok_or_else(out_of_range)?;
    Utc::now().checked_add_signed(age).ok_or_else(out_of_range)?;
    Ok(age)
}
