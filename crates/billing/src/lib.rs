// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! FlowAudit Billing Module
//!
//! Handles Stripe integration for the Pro subscription and the free-tier gate.
//!
//! ## Features
//!
//! - **Entitlement Gate**: Derive paid status and cap free users at a fixed number of audits
//! - **Usage Counter**: Audits generated so far, counted from history
//! - **Checkout**: Hosted Stripe Checkout for the single Pro price
//! - **Portal**: Stripe billing portal for existing customers
//! - **Webhooks**: Verify Stripe deliveries and reconcile subscriptions onto users

pub mod checkout;
pub mod client;
pub mod entitlement;
pub mod error;
pub mod portal;
pub mod subscription;
pub mod usage;
pub mod webhooks;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;


// Checkout
pub use checkout::CheckoutService;

// Client
pub use client::{
    BillingProvider, CheckoutCustomer, CheckoutRequest, HostedSession, StripeClient, StripeConfig,
};

// Entitlement
pub use entitlement::{
    is_paid, Entitlement, EntitlementGate, GateDecision, ModelTier, DEFAULT_FREE_AUDIT_LIMIT,
};

// Error
pub use error::{BillingError, BillingResult};

// Portal
pub use portal::PortalService;

// Subscription
pub use subscription::SubscriptionSnapshot;

// Usage
pub use usage::UsageCounter;

// Webhooks
pub use webhooks::{WebhookEvent, WebhookHandler, WebhookOutcome};

use std::sync::Arc;

use flowaudit_shared::AccountStore;

/// Main billing service that combines the Stripe-backed functionality
pub struct BillingService {
    pub checkout: CheckoutService,
    pub portal: PortalService,
    pub webhooks: WebhookHandler,
}

impl BillingService {
    /// Create a new billing service with explicit config
    pub fn new(config: StripeConfig, store: Arc<dyn AccountStore>, app_url: &str) -> Self {
        let webhook_secret = config.webhook_secret.clone();
        let price_id = config.pro_price_id.clone();
        let stripe: Arc<dyn BillingProvider> = Arc::new(StripeClient::new(&config));

        Self::with_provider(stripe, store, webhook_secret, price_id, app_url)
    }

    /// Create a billing service over any provider
    pub fn with_provider(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn AccountStore>,
        webhook_secret: impl Into<String>,
        price_id: impl Into<String>,
        app_url: &str,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(provider.clone(), price_id, app_url),
            portal: PortalService::new(provider.clone(), app_url),
            webhooks: WebhookHandler::new(provider, store, webhook_secret),
        }
    }
}
