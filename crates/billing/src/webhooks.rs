//! Stripe webhook handling
//!
//! Verifies signed deliveries and reconciles subscription state onto users.
//! Only `checkout.session.completed` and `invoice.payment_succeeded` change
//! anything; every other event type is acknowledged and ignored.
//!
//! Reconciliation writes are full-field overwrites taken from the freshly
//! retrieved subscription, so redelivering an event converges on the same
//! row. No event ledger is kept.

use std::sync::Arc;

use flowaudit_shared::{AccountStore, SubscriptionLink, SubscriptionRenewal};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::BillingProvider;
use crate::error::{BillingError, BillingResult};
use crate::subscription::{invoice_subscription_id, SubscriptionSnapshot};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";

/// Verified Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

/// What a handled event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    SubscriptionLinked { user_id: Uuid, subscription_id: String },
    SubscriptionRenewed { user_id: Uuid, subscription_id: String },
    Ignored { event_type: String },
}

/// Webhook handler for Stripe events
pub struct WebhookHandler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn AccountStore>,
    webhook_secret: String,
}

impl WebhookHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn AccountStore>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the `Stripe-Signature` header against the raw body and parse
    /// the event
    pub fn verify_event(&self, payload: &str, signature: &str) -> BillingResult<WebhookEvent> {
        self.verify_event_at(payload, signature, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Same as [`verify_event`](Self::verify_event) with an explicit clock
    pub fn verify_event_at(
        &self,
        payload: &str,
        signature: &str,
        now: i64,
    ) -> BillingResult<WebhookEvent> {
        // Header format: t=timestamp,v1=signature[,v1=signature...][,v0=...]
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = value.parse().ok(),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            tracing::warn!("Missing timestamp in signature header");
            BillingError::WebhookSignatureInvalid
        })?;

        if candidates.is_empty() {
            tracing::warn!("Missing v1 signature in signature header");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
            tracing::warn!(
                timestamp = timestamp,
                now = now,
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let expected = compute_signature(&self.webhook_secret, timestamp, payload)?;

        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| bytes.ct_eq(&expected).into())
                .unwrap_or(false)
        });

        if !matched {
            tracing::warn!("Webhook signature mismatch");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let event: WebhookEvent = serde_json::from_str(payload).map_err(|e| {
            tracing::error!(parse_error = %e, "Failed to parse webhook event JSON");
            BillingError::WebhookSignatureInvalid
        })?;

        Ok(event)
    }

    /// Handle a verified Stripe event
    pub async fn handle_event(&self, event: WebhookEvent) -> BillingResult<WebhookOutcome> {
        tracing::info!(
            event_type = %event.event_type,
            event_id = %event.id,
            "Processing Stripe webhook event"
        );

        let result = match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => self.handle_checkout_completed(&event.data.object).await,
            INVOICE_PAYMENT_SUCCEEDED => self.handle_invoice_paid(&event.data.object).await,
            other => {
                tracing::info!(event_type = %other, "Unhandled webhook event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: other.to_string(),
                })
            }
        };

        if let Err(e) = &result {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %e,
                "Webhook event processing failed"
            );
        }

        result
    }

    /// A completed checkout links the subscription to the user named in the
    /// session metadata
    async fn handle_checkout_completed(&self, session: &Value) -> BillingResult<WebhookOutcome> {
        let user_ref = session
            .get("metadata")
            .and_then(|m| m.get("userId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(BillingError::MissingUserReference)?;

        let user_id =
            Uuid::parse_str(user_ref).map_err(|_| BillingError::UserNotFound(user_ref.to_string()))?;

        let subscription_id = session
            .get("subscription")
            .and_then(crate::subscription::expandable_id)
            .ok_or(BillingError::MissingSubscriptionReference("checkout session"))?;

        let subscription = self.provider.retrieve_subscription(subscription_id).await?;
        let snapshot = SubscriptionSnapshot::from_value(&subscription)?;

        let link = SubscriptionLink {
            subscription_id: snapshot.id.clone(),
            customer_id: snapshot.customer_id,
            price_id: snapshot.price_id,
            current_period_end: snapshot.current_period_end,
        };

        let user = self
            .store
            .link_subscription(user_id, &link)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;

        tracing::info!(
            user_id = %user.id,
            subscription_id = %link.subscription_id,
            period_end = %link.current_period_end,
            "Subscription linked after checkout"
        );

        Ok(WebhookOutcome::SubscriptionLinked {
            user_id: user.id,
            subscription_id: link.subscription_id,
        })
    }

    /// A paid invoice refreshes price and period end on the user holding the
    /// subscription
    async fn handle_invoice_paid(&self, invoice: &Value) -> BillingResult<WebhookOutcome> {
        let subscription_id = invoice_subscription_id(invoice)
            .ok_or(BillingError::MissingSubscriptionReference("invoice"))?;

        let subscription = self.provider.retrieve_subscription(&subscription_id).await?;
        let snapshot = SubscriptionSnapshot::from_value(&subscription)?;

        let renewal = SubscriptionRenewal {
            price_id: snapshot.price_id,
            current_period_end: snapshot.current_period_end,
        };

        let user = self
            .store
            .renew_subscription(&subscription_id, &renewal)
            .await?
            .ok_or_else(|| BillingError::SubscriptionNotFound(subscription_id.clone()))?;

        tracing::info!(
            user_id = %user.id,
            subscription_id = %subscription_id,
            period_end = %renewal.current_period_end,
            "Subscription renewed from paid invoice"
        );

        Ok(WebhookOutcome::SubscriptionRenewed {
            user_id: user.id,
            subscription_id,
        })
    }
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`, keyed with the endpoint secret
pub(crate) fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &str,
) -> BillingResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        tracing::error!("Invalid webhook secret key");
        BillingError::WebhookSignatureInvalid
    })?;
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sign_payload, ScriptedBillingProvider};
    use flowaudit_shared::InMemoryStore;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_750_000_000;

    fn handler() -> WebhookHandler {
        WebhookHandler::new(
            Arc::new(ScriptedBillingProvider::new()),
            Arc::new(InMemoryStore::new()),
            SECRET,
        )
    }

    fn payload() -> String {
        json!({
            "id": "evt_1",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        })
        .to_string()
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let body = payload();
        let header = sign_payload(SECRET, NOW, &body);
        let event = handler().verify_event_at(&body, &header, NOW).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "customer.created");
    }

    #[test]
    fn test_verify_accepts_any_matching_v1() {
        let body = payload();
        let valid = sign_payload(SECRET, NOW, &body);
        let good_sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
        assert!(handler().verify_event_at(&body, &header, NOW).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let body = payload();
        let header = sign_payload(SECRET, NOW, &body);
        let tampered = body.replace("cus_1", "cus_2");
        let err = handler().verify_event_at(&tampered, &header, NOW).unwrap_err();
        assert!(matches!(err, BillingError::WebhookSignatureInvalid));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let body = payload();
        let header = sign_payload("whsec_other", NOW, &body);
        assert!(handler().verify_event_at(&body, &header, NOW).is_err());
    }

    #[test]
    fn test_verify_rejects_stale_timestamp() {
        let body = payload();
        let signed_at = NOW - SIGNATURE_TOLERANCE_SECS - 1;
        let header = sign_payload(SECRET, signed_at, &body);
        assert!(handler().verify_event_at(&body, &header, NOW).is_err());
    }

    #[test]
    fn test_verify_accepts_timestamp_at_tolerance_edge() {
        let body = payload();
        let signed_at = NOW - SIGNATURE_TOLERANCE_SECS;
        let header = sign_payload(SECRET, signed_at, &body);
        assert!(handler().verify_event_at(&body, &header, NOW).is_ok());
    }

    #[test]
    fn test_verify_rejects_malformed_headers() {
        let body = payload();
        let h = handler();
        assert!(h.verify_event_at(&body, "", NOW).is_err());
        assert!(h.verify_event_at(&body, "v1=abc", NOW).is_err());
        assert!(h.verify_event_at(&body, &format!("t={}", NOW), NOW).is_err());
        assert!(h
            .verify_event_at(&body, &format!("t={},v1=not-hex", NOW), NOW)
            .is_err());
    }

    #[test]
    fn test_verify_rejects_extreme_timestamps() {
        let body = payload();
        let h = handler();
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1={}", t, "00".repeat(32));
            assert!(matches!(
                h.verify_event_at(&body, &header, NOW),
                Err(BillingError::WebhookSignatureInvalid)
            ));
        }
        assert!(matches!(
            h.verify_event_at(&body, &sign_payload(SECRET, i64::MIN, &body), i64::MAX),
            Err(BillingError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn test_verify_rejects_signed_non_event_body() {
        let body = "not json";
        let header = sign_payload(SECRET, NOW, body);
        assert!(handler().verify_event_at(body, &header, NOW).is_err());
    }

    #[tokio::test]
    async fn test_unhandled_event_type_is_ignored() {
        let event: WebhookEvent = serde_json::from_str(&payload()).unwrap();
        let outcome = handler().handle_event(event).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "customer.created".to_string()
            }
        );
    }
}
