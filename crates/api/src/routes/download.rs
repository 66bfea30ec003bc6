//! Workflow download routes

use axum::{
    extract::{rejection::FormRejection, Extension, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::audits::owned_audit;
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const GENERATED_BY: &str = "FlowAudit AI";

#[derive(Debug, Deserialize)]
pub struct DownloadWorkflowForm {
    #[serde(rename = "workflowJson")]
    pub workflow_json: Option<String>,
    #[serde(rename = "auditId")]
    pub audit_id: Option<String>,
}

/// `flowaudit-workflow-<last 8 chars of id>.json`. Only `[A-Za-z0-9_-]`
/// from the tail is kept since the id arrives from an unauthenticated form.
pub fn download_filename(audit_id: Option<&str>) -> String {
    let tail: String = audit_id
        .map(|id| {
            let chars: Vec<char> = id.trim().chars().collect();
            chars[chars.len().saturating_sub(8)..]
                .iter()
                .filter(|c| c.is_ascii_alphanumeric() || **c == '-' || **c == '_')
                .collect()
        })
        .unwrap_or_default();

    if tail.is_empty() {
        "flowaudit-workflow.json".to_string()
    } else {
        format!("flowaudit-workflow-{}.json", tail)
    }
}

fn attachment(body: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// Re-serve a workflow the browser already holds as a file download.
///
/// The form carries the document base64-encoded so it survives a plain
/// HTML form post.
pub async fn download_workflow(
    form: Result<Form<DownloadWorkflowForm>, FormRejection>,
) -> ApiResult<Response> {
    let missing = || ApiError::BadRequest("Missing workflow data".to_string());

    let Form(form) = form.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable download form");
        missing()
    })?;

    let encoded = form
        .workflow_json
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(missing)?;

    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid workflow data".to_string()))?;

    Ok(attachment(decoded, &download_filename(form.audit_id.as_deref())))
}

/// Download the stored workflow of an owned audit, tagged with export metadata
pub async fn download_audit_workflow(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(audit_id): Path<String>,
) -> ApiResult<Response> {
    let audit = owned_audit(&state, &auth_user, &audit_id).await?;
    let audit_id = audit.id.to_string();

    let exported_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    let mut workflow = audit.workflow_json;
    if let Value::Object(map) = &mut workflow {
        map.insert(
            "meta".to_string(),
            json!({
                "generatedBy": GENERATED_BY,
                "auditId": audit_id,
                "exportedAt": exported_at,
            }),
        );
    }

    let body = serde_json::to_string_pretty(&workflow)
        .map_err(|e| ApiError::Internal(format!("Failed to encode workflow: {}", e)))?;

    tracing::info!(audit_id = %audit_id, "Workflow downloaded");

    Ok(attachment(body, &download_filename(Some(&audit_id))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_uses_last_eight_chars() {
        assert_eq!(
            download_filename(Some("0b6f1c2e-5d4a-4f3b-9c8d-7e6f5a4b3c2d")),
            "flowaudit-workflow-5a4b3c2d.json"
        );
        assert_eq!(download_filename(Some("abc")), "flowaudit-workflow-abc.json");
        assert_eq!(download_filename(None), "flowaudit-workflow.json");
        assert_eq!(download_filename(Some("  ")), "flowaudit-workflow.json");
    }

    #[test]
    fn test_filename_drops_header_breaking_chars() {
        assert_eq!(
            download_filename(Some("abc\"x\r\nSet")),
            "flowaudit-workflow-cxSet.json"
        );
        assert_eq!(download_filename(Some("\"\r\n\"")), "flowaudit-workflow.json");
    }
}
