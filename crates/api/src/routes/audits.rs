//! Audit history and dashboard routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use flowaudit_billing::{is_paid, Entitlement};
use flowaudit_shared::{Audit, User};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Estimated manual hours removed per generated audit
pub const HOURS_SAVED_PER_AUDIT: i64 = 3;

const RECENT_AUDITS: i64 = 3;
const PREVIEW_NODES: usize = 4;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct NodePreview {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub name: Option<String>,
    pub node_count: usize,
    pub nodes: Vec<NodePreview>,
}

impl WorkflowSummary {
    pub fn from_workflow(workflow: &Value) -> Self {
        let nodes = workflow
            .get("nodes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Self {
            name: workflow.get("name").and_then(Value::as_str).map(String::from),
            node_count: nodes.len(),
            nodes: nodes
                .iter()
                .take(PREVIEW_NODES)
                .map(|node| NodePreview {
                    name: node.get("name").and_then(Value::as_str).map(String::from),
                    node_type: node.get("type").and_then(Value::as_str).map(String::from),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub id: Uuid,
    pub original_input: String,
    pub analysis_report: String,
    pub workflow: WorkflowSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Audit> for AuditSummary {
    fn from(audit: &Audit) -> Self {
        Self {
            id: audit.id,
            original_input: audit.original_input.clone(),
            analysis_report: audit.analysis_report.clone(),
            workflow: WorkflowSummary::from_workflow(&audit.workflow_json),
            created_at: audit.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDetail {
    pub id: Uuid,
    pub original_input: String,
    pub analysis_report: String,
    pub workflow: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Audit> for AuditDetail {
    fn from(audit: Audit) -> Self {
        Self {
            id: audit.id,
            original_input: audit.original_input,
            analysis_report: audit.analysis_report,
            workflow: audit.workflow_json,
            created_at: audit.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_audits: i64,
    pub hours_saved: i64,
    pub is_pro: bool,
    pub free_audit_limit: i64,
    /// `None` for Pro users
    pub remaining_free_audits: Option<i64>,
    pub recent_audits: Vec<AuditSummary>,
}

/// The caller's user row, if they have ever generated or checked out
async fn current_user(state: &AppState, auth_user: &AuthUser) -> ApiResult<Option<User>> {
    Ok(state
        .store
        .find_user_by_identity(&auth_user.identity_id)
        .await?)
}

/// Find an audit owned by `user`, 404 otherwise
pub(super) async fn owned_audit(
    state: &AppState,
    auth_user: &AuthUser,
    audit_id: &str,
) -> ApiResult<Audit> {
    let not_found = || ApiError::NotFound("Audit not found".to_string());

    let audit_id = Uuid::parse_str(audit_id).map_err(|_| not_found())?;
    let user = current_user(state, auth_user).await?.ok_or_else(not_found)?;

    state
        .store
        .find_audit(user.id, audit_id)
        .await?
        .ok_or_else(not_found)
}

/// List the caller's audits, newest first
pub async fn list_audits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<DataResponse<Vec<AuditSummary>>>> {
    let audits = match current_user(&state, &auth_user).await? {
        Some(user) => state.store.list_audits(user.id, None).await?,
        None => Vec::new(),
    };

    Ok(DataResponse::ok(audits.iter().map(AuditSummary::from).collect()))
}

/// Get one audit owned by the caller
pub async fn get_audit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(audit_id): Path<String>,
) -> ApiResult<Json<DataResponse<AuditDetail>>> {
    let audit = owned_audit(&state, &auth_user, &audit_id).await?;
    Ok(DataResponse::ok(AuditDetail::from(audit)))
}

/// Usage summary for the dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<DataResponse<DashboardData>>> {
    let (entitlement, recent) = match current_user(&state, &auth_user).await? {
        Some(user) => {
            let audits_used = state.usage.audits_used(user.id).await?;
            let entitlement = Entitlement {
                is_paid: is_paid(&user.billing_snapshot(), OffsetDateTime::now_utc()),
                audits_used,
            };
            let recent = state.store.list_audits(user.id, Some(RECENT_AUDITS)).await?;
            (entitlement, recent)
        }
        None => (
            Entitlement {
                is_paid: false,
                audits_used: 0,
            },
            Vec::new(),
        ),
    };

    let decision = state.gate.decide(entitlement);

    Ok(DataResponse::ok(DashboardData {
        total_audits: entitlement.audits_used,
        hours_saved: entitlement.audits_used * HOURS_SAVED_PER_AUDIT,
        is_pro: entitlement.is_paid,
        free_audit_limit: decision.free_limit,
        remaining_free_audits: decision.remaining_free(),
        recent_audits: recent.iter().map(AuditSummary::from).collect(),
    }))
}
