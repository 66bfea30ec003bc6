//! Self-service billing portal

use std::sync::Arc;

use flowaudit_shared::User;

use crate::client::{BillingProvider, HostedSession};
use crate::error::{BillingError, BillingResult};

pub struct PortalService {
    provider: Arc<dyn BillingProvider>,
    app_url: String,
}

impl PortalService {
    pub fn new(provider: Arc<dyn BillingProvider>, app_url: impl Into<String>) -> Self {
        Self {
            provider,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Open a portal session for a user who has a Stripe customer
    pub async fn create_portal(&self, user: &User) -> BillingResult<HostedSession> {
        let customer_id = user
            .stripe_customer_id
            .as_deref()
            .ok_or(BillingError::NoCustomer)?;

        let return_url = format!("{}/dashboard", self.app_url);
        let session = self
            .provider
            .create_portal_session(customer_id, &return_url)
            .await?;

        tracing::info!(
            user_id = %user.id,
            customer_id = %customer_id,
            "Created billing portal session"
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
    async fn test_portal_without_customer() {
        let store = InMemoryStore::new();
        let user = store.upsert_user("user_a", "a@example.com").await.unwrap();
        let provider = Arc::new(ScriptedBillingProvider::new());
        let service = PortalService::new(provider.clone(), "https://app.test");

        let err = service.create_portal(&user).await.unwrap_err();
        assert!(matches!(err, BillingError::NoCustomer));
        assert!(provider.portal_requests().is_empty());
    }

    #[tokio::test]
    async fn test_portal_returns_to_dashboard() {
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
        let service = PortalService::new(provider.clone(), "https://app.test");

        service.create_portal(&user).await.unwrap();

        assert_eq!(
            provider.portal_requests(),
            vec![("cus_1".to_string(), "https://app.test/dashboard".to_string())]
        );
    }
}
