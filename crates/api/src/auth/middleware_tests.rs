//! Unit tests for authentication middleware
//!
//! Tests cover:
//! - Requests without credentials
//! - Bearer header and session cookie authentication
//! - Expired and forged tokens
//! - AuthUser propagation to handlers

#[cfg(test)]
mod tests {
    use super::super::jwt::IdentityVerifier;
    use super::super::middleware::*;
    use crate::test_util::{mint_token, TEST_JWT_SECRET};
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{header, Request, StatusCode},
        middleware,
        response::Response,
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn auth_state() -> AuthState {
        AuthState {
            verifier: Arc::new(IdentityVerifier::from_secret(TEST_JWT_SECRET.as_bytes())),
        }
    }

    async fn whoami(Extension(user): Extension<AuthUser>) -> Json<Value> {
        Json(json!({
            "identityId": user.identity_id,
            "email": user.email_or_placeholder(),
        }))
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(auth_state(), require_auth))
    }

    async fn call(request: Request<Body>) -> Response {
        app().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_401_json() {
        let response = call(Request::builder().uri("/whoami").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "error": "Unauthorized. Please sign in." })
        );
    }

    #[tokio::test]
    async fn test_bearer_header_authenticates() {
        let token = mint_token("user_2header", Some("header@example.com"), 600);
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = call(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["identityId"], "user_2header");
        assert_eq!(body["email"], "header@example.com");
    }

    #[tokio::test]
    async fn test_session_cookie_authenticates() {
        let token = mint_token("user_2cookie", None, 600);
        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
            .body(Body::empty())
            .unwrap();

        let response = call(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["identityId"], "user_2cookie");
        assert_eq!(body["email"], "user_2cookie@unknown.com");
    }

    #[tokio::test]
    async fn test_expired_token_returns_401() {
        let token = mint_token("user_2expired", None, -600);
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = call(request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_in_header_not_rescued_by_cookie() {
        let good = mint_token("user_2cookie", None, 600);
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer forged.token.value")
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, good))
            .body(Body::empty())
            .unwrap();

        let response = call(request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_auth_error_is_500() {
        let response = axum::response::IntoResponse::into_response(AuthError::Internal(
            "key load failed".to_string(),
        ));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
