//! Test doubles for code that depends on [`BillingProvider`]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::{BillingProvider, CheckoutRequest, HostedSession};
use crate::error::{BillingError, BillingResult};
use crate::webhooks::compute_signature;

/// Billing provider answering from scripted subscriptions and recording the
/// sessions it was asked to create
#[derive(Default)]
pub struct ScriptedBillingProvider {
    subscriptions: Mutex<HashMap<String, Value>>,
    checkout_requests: Mutex<Vec<CheckoutRequest>>,
    portal_requests: Mutex<Vec<(String, String)>>,
    retrievals: Mutex<usize>,
}

impl ScriptedBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw subscription object under its `id`
    pub fn with_subscription(self, subscription: Value) -> Self {
        self.put_subscription(subscription);
        self
    }

    pub fn put_subscription(&self, subscription: Value) {
        if let Some(id) = subscription.get("id").and_then(Value::as_str) {
            if let Ok(mut subs) = self.subscriptions.lock() {
                subs.insert(id.to_string(), subscription);
            }
        }
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkout_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// `(customer_id, return_url)` pairs
    pub fn portal_requests(&self) -> Vec<(String, String)> {
        self.portal_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn retrieval_count(&self) -> usize {
        self.retrievals.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl BillingProvider for ScriptedBillingProvider {
    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Value> {
        if let Ok(mut n) = self.retrievals.lock() {
            *n += 1;
        }
        self.subscriptions
            .lock()
            .ok()
            .and_then(|subs| subs.get(subscription_id).cloned())
            .ok_or_else(|| BillingError::Stripe(format!("No such subscription: '{}'", subscription_id)))
    }

    async fn create_checkout_session(&self, request: CheckoutRequest) -> BillingResult<HostedSession> {
        let id = format!("cs_test_{}", request.user_id.simple());
        if let Ok(mut r) = self.checkout_requests.lock() {
            r.push(request);
        }
        Ok(HostedSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<HostedSession> {
        if let Ok(mut r) = self.portal_requests.lock() {
            r.push((customer_id.to_string(), return_url.to_string()));
        }
        Ok(HostedSession {
            id: format!("bps_test_{}", customer_id),
            url: format!("https://billing.stripe.test/p/session/{}", customer_id),
        })
    }
}

/// Subscription object in the newer API shape, with the period end on the
/// first item
pub fn subscription_object(id: &str, customer: &str, price: &str, period_end: i64) -> Value {
    json!({
        "id": id,
        "object": "subscription",
        "customer": customer,
        "status": "active",
        "items": {
            "object": "list",
            "data": [
                {
                    "id": format!("si_{}", id),
                    "price": { "id": price, "object": "price" },
                    "current_period_end": period_end
                }
            ]
        }
    })
}

/// Build a `Stripe-Signature` header value for `payload`
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> String {
    let signature = compute_signature(secret, timestamp, payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}
