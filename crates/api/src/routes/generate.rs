//! Audit generation route

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    generation::ValidationError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct GenerateAuditRequest {
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateAuditResponse {
    pub success: bool,
    pub data: GeneratedAuditData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAuditData {
    pub analysis: String,
    pub workflow: Value,
    pub audit_id: Uuid,
}

/// Generate an audit for the signed-in user
pub async fn generate_audit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Result<Json<GenerateAuditRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateAuditResponse>> {
    let Json(req) = body.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable generate-audit body");
        ApiError::BadRequest(ValidationError::Missing.to_string())
    })?;

    let generated = state
        .generation
        .generate(&auth_user.requester(), req.input.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(identity_id = %auth_user.identity_id, error = %e, "Audit generation failed");
            ApiError::from(e)
        })?;

    Ok(Json(GenerateAuditResponse {
        success: true,
        data: GeneratedAuditData {
            analysis: generated.analysis,
            workflow: generated.workflow,
            audit_id: generated.audit_id,
        },
    }))
}
