//! Persisted data model

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// One authenticated account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Subject id issued by the identity provider (stable, unique)
    pub identity_id: String,
    pub email: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub stripe_current_period_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const PLACEHOLDER_EMAIL_DOMAIN: &str = "unknown.com";

/// Email recorded when the identity token carries none
pub fn placeholder_email(identity_id: &str) -> String {
    format!("{}@{}", identity_id, PLACEHOLDER_EMAIL_DOMAIN)
}

impl User {
    /// True when no real address is known for this user
    pub fn has_placeholder_email(&self) -> bool {
        self.email == placeholder_email(&self.identity_id)
    }

    pub fn billing_snapshot(&self) -> BillingSnapshot {
        BillingSnapshot {
            customer_id: self.stripe_customer_id.clone(),
            subscription_id: self.stripe_subscription_id.clone(),
            price_id: self.stripe_price_id.clone(),
            current_period_end: self.stripe_current_period_end,
        }
    }
}

/// Billing fields mirrored from Stripe onto a user row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingSnapshot {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<OffsetDateTime>,
}

/// Full billing write applied when a checkout completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionLink {
    pub subscription_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub current_period_end: OffsetDateTime,
}

/// Billing refresh applied when a renewal invoice is paid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRenewal {
    pub price_id: String,
    pub current_period_end: OffsetDateTime,
}

/// Billing snapshot and audit count read together for a gate decision
#[derive(Debug, Clone)]
pub struct UsageSnapshot {
    pub user_id: Uuid,
    pub billing: BillingSnapshot,
    pub audits_used: i64,
}

/// One completed generation
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Audit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_input: String,
    pub analysis_report: String,
    /// Generated workflow document, stored as-is
    pub workflow_json: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAudit {
    pub user_id: Uuid,
    pub original_input: String,
    pub analysis_report: String,
    pub workflow_json: serde_json::Value,
}
