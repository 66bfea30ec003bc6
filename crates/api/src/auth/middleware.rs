//! Authentication middleware for Axum

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::{AUTHORIZATION, COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use flowaudit_shared::placeholder_email;

use super::jwt::IdentityVerifier;
use crate::error::ApiError;
use crate::generation::Requester;

/// Session cookie set by the identity provider's frontend SDK
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated caller extracted from a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub identity_id: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Email for user records; never blocks when the token carries none
    pub fn email_or_placeholder(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| placeholder_email(&self.identity_id))
    }

    pub fn requester(&self) -> Requester {
        Requester {
            identity_id: self.identity_id.clone(),
            email: self.email_or_placeholder(),
        }
    }
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<IdentityVerifier>,
}

fn extract_token_from_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .filter(|token| !token.is_empty())
                    .map(String::from)
            })
        })
}

/// Extract bearer token from Authorization header or session cookie
/// Prefers Authorization header but falls back to cookie for same-site browser requests
pub(crate) fn extract_bearer_token(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    extract_token_from_cookie(request)
}

/// Middleware that requires authentication
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let auth_result = match extract_bearer_token(&request) {
        Some(token) => auth_state.verifier.verify(&token),
        None => Err(AuthError::MissingAuth),
    };

    match auth_result {
        Ok(auth_user) => {
            tracing::debug!(
                path = %path,
                identity_id = %auth_user.identity_id,
                "require_auth: authentication successful"
            );
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => {
            tracing::info!(path = %path, error = %err, "require_auth: authentication failed");
            err.into_response()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingAuth | AuthError::InvalidToken => ApiError::Unauthorized,
            AuthError::Internal(_) => ApiError::Internal("Internal server error".to_string()),
        }
        .into_response()
    }
}
