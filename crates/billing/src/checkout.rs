//! Hosted checkout for the Pro subscription

use std::sync::Arc;

use flowaudit_shared::User;

use crate::client::{BillingProvider, CheckoutCustomer, CheckoutRequest, HostedSession};
use crate::error::BillingResult;

pub struct CheckoutService {
    provider: Arc<dyn BillingProvider>,
    price_id: String,
    app_url: String,
}

impl CheckoutService {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        price_id: impl Into<String>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            price_id: price_id.into(),
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Start a subscription checkout for `user`.
    ///
    /// The user id travels in session metadata so the completion webhook can
    /// find the account again. A user who already has a Stripe customer keeps
    /// it; otherwise the form is prefilled with their email.
    pub async fn create_checkout(&self, user: &User) -> BillingResult<HostedSession> {
        let customer = match &user.stripe_customer_id {
            Some(customer_id) => CheckoutCustomer::Existing(customer_id.clone()),
            None if user.has_placeholder_email() => CheckoutCustomer::Anonymous,
            None => CheckoutCustomer::Email(user.email.clone()),
        };

        let request = CheckoutRequest {
            user_id: user.id,
            customer,
            price_id: self.price_id.clone(),
            success_url: format!("{}/dashboard?success=true", self.app_url),
            cancel_url: format!("{}/dashboard?canceled=true", self.app_url),
        };

        let session = self.provider.create_checkout_session(request).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            "Created checkout session"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBillingProvider;
    use flowaudit_shared::{AccountStore, InMemoryStore, SubscriptionLink};
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_new_customer_checkout_uses_email_and_metadata_user() {
        let store = InMemoryStore::new();
        let user = store.upsert_user("user_a", "a@example.com").await.unwrap();
        let provider = Arc::new(ScriptedBillingProvider::new());
        let service = CheckoutService::new(provider.clone(), "price_pro", "https://app.test/");

        let session = service.create_checkout(&user).await.unwrap();
        assert!(session.url.starts_with("https://"));

        let requests = provider.checkout_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.user_id, user.id);
        assert_eq!(request.customer, CheckoutCustomer::Email("a@example.com".to_string()));
        assert_eq!(request.price_id, "price_pro");
        assert_eq!(request.success_url, "https://app.test/dashboard?success=true");
        assert_eq!(request.cancel_url, "https://app.test/dashboard?canceled=true");
    }

    #[tokio::test]
    async fn test_placeholder_email_is_not_prefilled() {
        let store = InMemoryStore::new();
        let user = store
            .upsert_user("user_a", &flowaudit_shared::placeholder_email("user_a"))
            .await
            .unwrap();
        let provider = Arc::new(ScriptedBillingProvider::new());
        let service = CheckoutService::new(provider.clone(), "price_pro", "https://app.test");

        service.create_checkout(&user).await.unwrap();

        assert_eq!(provider.checkout_requests()[0].customer, CheckoutCustomer::Anonymous);
    }

    #[tokio::test]
    async fn test_existing_customer_is_reused() {
        let store = InMemoryStore::new();
        let user = store.upsert_user("user_a", "a@example.com").await.unwrap();
        let user = store
            .link_subscription(
                user.id,
                &SubscriptionLink {
                    subscription_id: "sub_1".to_string(),
                    customer_id: "cus_1".to_string(),
                    price_id: "price_pro".to_string(),
                    current_period_end: OffsetDateTime::now_utc(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        let provider = Arc::new(ScriptedBillingProvider::new());
        let service = CheckoutService::new(provider.clone(), "price_pro", "https://app.test");

        service.create_checkout(&user).await.unwrap();

        assert_eq!(
            provider.checkout_requests()[0].customer,
            CheckoutCustomer::Existing("cus_1".to_string())
        );
    }
}
