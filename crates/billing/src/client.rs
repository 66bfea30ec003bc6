//! Stripe client and configuration

use std::collections::HashMap;

use async_trait::async_trait;
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionBillingAddressCollection,
    CheckoutSessionMode, CreateBillingPortalSession, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodTypes, CustomerId,
};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// Stripe credentials and the single subscription price sold
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub pro_price_id: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("pro_price_id", &self.pro_price_id)
            .finish()
    }
}

/// Thin wrapper over the async-stripe client
#[derive(Clone)]
pub struct StripeClient {
    inner: stripe::Client,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: stripe::Client::new(config.secret_key.clone()),
        }
    }
}

/// Who the checkout session is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutCustomer {
    /// Reuse the customer from an earlier subscription
    Existing(String),
    /// Prefill the email on the checkout form
    Email(String),
    /// No known address; Stripe collects it on the checkout page
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub customer: CheckoutCustomer,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A Stripe-hosted page the user is redirected to
#[derive(Debug, Clone, serde::Serialize)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

/// Outbound calls to the billing provider.
///
/// Injected into the reconciler and the checkout/portal services so tests can
/// substitute a scripted provider.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Fetch a subscription as raw JSON. The shape differs across Stripe API
    /// versions, so callers pick fields out defensively.
    async fn retrieve_subscription(&self, subscription_id: &str)
        -> BillingResult<serde_json::Value>;

    async fn create_checkout_session(&self, request: CheckoutRequest)
        -> BillingResult<HostedSession>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<HostedSession>;
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<serde_json::Value> {
        let subscription: serde_json::Value = self
            .inner
            .get(&format!("/subscriptions/{}", subscription_id))
            .await?;

        Ok(subscription)
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BillingResult<HostedSession> {
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), request.user_id.to_string());

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.success_url = Some(request.success_url.as_str());
        params.cancel_url = Some(request.cancel_url.as_str());
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.billing_address_collection = Some(CheckoutSessionBillingAddressCollection::Auto);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);
        params.metadata = Some(metadata);

        match &request.customer {
            CheckoutCustomer::Existing(customer_id) => {
                let customer_id: CustomerId = customer_id.parse().map_err(|_| {
                    BillingError::Stripe(format!("Invalid customer ID: {}", customer_id))
                })?;
                params.customer = Some(customer_id);
            }
            CheckoutCustomer::Email(email) => {
                params.customer_email = Some(email.as_str());
            }
            CheckoutCustomer::Anonymous => {}
        }

        let session = match CheckoutSession::create(&self.inner, params).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(
                    user_id = %request.user_id,
                    error = %e,
                    "Stripe Checkout Session creation failed"
                );
                return Err(e.into());
            }
        };

        let url = session
            .url
            .ok_or_else(|| BillingError::Stripe("No checkout URL returned".to_string()))?;

        Ok(HostedSession {
            id: session.id.to_string(),
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<HostedSession> {
        let customer: CustomerId = customer_id
            .parse()
            .map_err(|_| BillingError::Stripe(format!("Invalid customer ID: {}", customer_id)))?;

        let mut params = CreateBillingPortalSession::new(customer);
        params.return_url = Some(return_url);

        let session = BillingPortalSession::create(&self.inner, params).await?;

        Ok(HostedSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }
}
