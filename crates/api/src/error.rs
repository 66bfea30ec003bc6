//! API error type mapped to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flowaudit_billing::BillingError;
use flowaudit_shared::StoreError;
use serde_json::json;

use crate::generation::GenerationError;
use crate::llm::CompletionError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized. Please sign in.")]
    Unauthorized,

    #[error("{0}")]
    UpgradeRequired(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Message is shown to the caller as-is
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::UpgradeRequired(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::QuotaExceeded(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn billing_disabled() -> Self {
        ApiError::ServiceUnavailable("Billing is not configured".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::UpgradeRequired(message) => json!({
                "success": false,
                "error": message,
                "requiresUpgrade": true
            }),
            other => json!({
                "success": false,
                "error": other.to_string()
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Storage error");
        ApiError::Internal("Internal server error".to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::NoCustomer => ApiError::NotFound(err.to_string()),
            ref e if e.is_rejection() => ApiError::BadRequest(e.to_string()),
            e => {
                tracing::error!(error = %e, "Billing error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::RateLimited => {
                ApiError::RateLimited("AI service is busy. Please try again in a moment.".to_string())
            }
            CompletionError::QuotaExceeded => ApiError::QuotaExceeded(
                "OpenAI quota exceeded. Please check your API billing.".to_string(),
            ),
            CompletionError::InvalidCredentials => ApiError::Internal(
                "Invalid OpenAI API key. Check your server configuration.".to_string(),
            ),
            other => ApiError::Internal(format!("Failed to generate audit: {}", other)),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(e) => ApiError::BadRequest(e.to_string()),
            GenerationError::UpgradeRequired => ApiError::UpgradeRequired(err.to_string()),
            GenerationError::Completion(e) => e.into(),
            GenerationError::InvalidResponse(e) => {
                ApiError::Internal(format!("Failed to generate audit: {}", e))
            }
            GenerationError::Store(e) => {
                tracing::error!(error = %e, "Failed to persist audit");
                ApiError::Internal(format!("Failed to generate audit: {}", e))
            }
            GenerationError::Billing(e) => {
                tracing::error!(error = %e, "Entitlement check failed");
                ApiError::Internal(format!("Failed to generate audit: {}", e))
            }
        }
    }
}
