//! Billing routes for Stripe integration

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use flowaudit_billing::WebhookOutcome;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Hosted page the browser should be sent to
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub url: String,
}

/// Create a checkout session for the Pro plan
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<RedirectResponse>> {
    let billing = state.billing_service().ok_or_else(ApiError::billing_disabled)?;

    let user = state
        .store
        .find_user_by_identity(&auth_user.identity_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let session = billing.checkout.create_checkout(&user).await?;

    tracing::info!(
        user_id = %user.id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(RedirectResponse { url: session.url }))
}

/// Create a billing portal session for the stored customer
pub async fn create_portal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<RedirectResponse>> {
    let billing = state.billing_service().ok_or_else(ApiError::billing_disabled)?;

    let user = state
        .store
        .find_user_by_identity(&auth_user.identity_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No Stripe customer found".to_string()))?;

    let session = billing.portal.create_portal(&user).await?;

    tracing::info!(user_id = %user.id, "Billing portal session created");

    Ok(Json(RedirectResponse { url: session.url }))
}

/// Handle Stripe webhook events
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<Value>> {
    tracing::info!(body_len = body.len(), "Stripe webhook received");

    let billing = state.billing_service().ok_or_else(ApiError::billing_disabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Stripe webhook missing signature header");
            ApiError::BadRequest("Invalid webhook signature".to_string())
        })?;

    let event = billing
        .webhooks
        .verify_event(&body, signature)
        .map_err(|e| {
            tracing::warn!(error = %e, "Stripe webhook signature verification failed");
            ApiError::BadRequest("Invalid webhook signature".to_string())
        })?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Stripe webhook event verified"
    );

    let outcome = billing.webhooks.handle_event(event).await.map_err(|e| {
        tracing::error!(error = %e, "Webhook handling error");
        ApiError::from(e)
    })?;

    match &outcome {
        WebhookOutcome::Ignored { event_type } => {
            tracing::debug!(event_type = %event_type, "Stripe webhook ignored")
        }
        other => tracing::info!(outcome = ?other, "Stripe webhook processed successfully"),
    }

    Ok(Json(json!({ "received": true })))
}
