//! API routes

mod audits;
mod billing;
mod download;
mod generate;
mod health;


use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{auth::require_auth, state::AppState};

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/download-workflow", post(download::download_workflow))
        // Stripe webhook (authenticated by signature)
        .route("/api/webhook/stripe", post(billing::stripe_webhook));

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route("/api/generate-audit", post(generate::generate_audit))
        .route("/api/dashboard", get(audits::dashboard))
        .route("/api/audits", get(audits::list_audits))
        .route("/api/audits/{id}", get(audits::get_audit))
        .route(
            "/api/audits/{id}/workflow",
            get(download::download_audit_workflow),
        )
        .route("/api/stripe/checkout", post(billing::create_checkout))
        .route("/api/stripe/portal", post(billing::create_portal))
        .route_layer(middleware::from_fn_with_state(
            state.auth_state(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
