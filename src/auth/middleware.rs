use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use tracing::warn;

use crate::auth::{Identity, TokenService};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Identity of the caller, resolved from the `Authorization: Bearer` header.
///
/// Taking this as a handler argument makes the handler unreachable without a
/// valid token. The resolved identity is also stored in the request
/// extensions so later extractions on the same request skip verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl AuthenticatedUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(AuthenticatedUser))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AppError> {
    if let Some(identity) = req.extensions().get::<Identity>() {
        return Ok(identity.clone());
    }

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    let identity = check_header(req, &state.tokens).map_err(|e| {
        warn!(path = %req.path(), reason = %e, "Rejected unauthenticated request");
        AppError::from(e)
    })?;

    req.extensions_mut().insert(identity.clone());
    Ok(identity)
}

fn check_header(req: &HttpRequest, tokens: &TokenService) -> Result<Identity, AuthError> {
    let token = bearer_token(req).ok_or(AuthError::MissingToken)?;
    tokens.verify(token)
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split_once(' '))
        // Scheme names are case-insensitive.
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn tokens() -> TokenService {
        TokenService::new("gate-secret", None).unwrap()
    }

    #[test]
    fn test_missing_header() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(check_header(&req, &tokens()).unwrap_err(), AuthError::MissingToken);
    }

    #[test]
    fn test_wrong_scheme() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic YWxpY2U6cHc="))
            .to_http_request();
        assert_eq!(check_header(&req, &tokens()).unwrap_err(), AuthError::MissingToken);

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(check_header(&req, &tokens()).unwrap_err(), AuthError::MissingToken);
    }

    #[test]
    fn test_invalid_token() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer not.a.token"))
            .to_http_request();
        assert_eq!(check_header(&req, &tokens()).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_valid_token() {
        let service = tokens();
        let token = service.issue(&Identity::new("alice")).unwrap();
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();
        assert_eq!(check_header(&req, &service).unwrap(), Identity::new("alice"));
    }

    #[test]
    fn test_scheme_case_insensitive() {
        let service = tokens();
        let token = service.issue(&Identity::new("alice")).unwrap();
        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let req = TestRequest::default()
                .insert_header((AUTHORIZATION, format!("{} {}", scheme, token)))
                .to_http_request();
            assert_eq!(check_header(&req, &service).unwrap(), Identity::new("alice"), "{}", scheme);
        }
    }

    #[test]
    fn test_bound_identity_short_circuits() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(Identity::new("bob"));
        assert_eq!(authenticate(&req).unwrap(), Identity::new("bob"));
    }

    #[test]
    fn test_without_state_is_internal_error() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer whatever"))
            .to_http_request();
        assert!(matches!(authenticate(&req), Err(AppError::InternalError(_))));
    }
}
