//! In-memory implementation of [`AccountStore`] for tests and local runs without PostgreSQL

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Audit, NewAudit, SubscriptionLink, SubscriptionRenewal, UsageSnapshot, User,
};
use crate::store::AccountStore;

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// Insertion order is creation order
    audits: RwLock<Vec<Audit>>,
    fail_audit_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_audit` fail with a database error
    pub fn set_fail_audit_inserts(&self, fail: bool) {
        self.fail_audit_inserts.store(fail, Ordering::SeqCst);
    }

    pub async fn audit_total(&self) -> usize {
        self.audits.read().await.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn upsert_user(&self, identity_id: &str, email: &str) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let now = OffsetDateTime::now_utc();

        if let Some(user) = users.values_mut().find(|u| u.identity_id == identity_id) {
            user.email = email.to_string();
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            identity_id: identity_id.to_string(),
            email: email.to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            stripe_price_id: None,
            stripe_current_period_end: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_user_by_identity(&self, identity_id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.identity_id == identity_id)
            .cloned())
    }

    async fn usage_snapshot(&self, user_id: Uuid) -> StoreResult<Option<UsageSnapshot>> {
        let users = self.users.read().await;
        let audits = self.audits.read().await;

        Ok(users.get(&user_id).map(|user| UsageSnapshot {
            user_id,
            billing: user.billing_snapshot(),
            audits_used: audits.iter().filter(|a| a.user_id == user_id).count() as i64,
        }))
    }

    async fn count_audits(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .audits
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .count() as i64)
    }

    async fn link_subscription(
        &self,
        user_id: Uuid,
        link: &SubscriptionLink,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        let held_elsewhere = users.values().any(|u| {
            u.id != user_id
                && u.stripe_subscription_id.as_deref() == Some(link.subscription_id.as_str())
        });
        if held_elsewhere {
            return Err(StoreError::Conflict(format!(
                "subscription {} already linked to another user",
                link.subscription_id
            )));
        }

        Ok(users.get_mut(&user_id).map(|user| {
            user.stripe_subscription_id = Some(link.subscription_id.clone());
            user.stripe_customer_id = Some(link.customer_id.clone());
            user.stripe_price_id = Some(link.price_id.clone());
            user.stripe_current_period_end = Some(link.current_period_end);
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }

    async fn renew_subscription(
        &self,
        subscription_id: &str,
        renewal: &SubscriptionRenewal,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        Ok(users
            .values_mut()
            .find(|u| u.stripe_subscription_id.as_deref() == Some(subscription_id))
            .map(|user| {
                user.stripe_price_id = Some(renewal.price_id.clone());
                user.stripe_current_period_end = Some(renewal.current_period_end);
                user.updated_at = OffsetDateTime::now_utc();
                user.clone()
            }))
    }

    async fn insert_audit(&self, audit: NewAudit) -> StoreResult<Audit> {
        if self.fail_audit_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database("audit insert rejected".to_string()));
        }
        if !self.users.read().await.contains_key(&audit.user_id) {
            return Err(StoreError::Database(format!(
                "audits.user_id {} violates foreign key",
                audit.user_id
            )));
        }

        let audit = Audit {
            id: Uuid::new_v4(),
            user_id: audit.user_id,
            original_input: audit.original_input,
            analysis_report: audit.analysis_report,
            workflow_json: audit.workflow_json,
            created_at: OffsetDateTime::now_utc(),
        };
        self.audits.write().await.push(audit.clone());
        Ok(audit)
    }

    async fn list_audits(&self, user_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Audit>> {
        let audits = self.audits.read().await;
        let newest_first = audits.iter().rev().filter(|a| a.user_id == user_id).cloned();

        Ok(match limit {
            Some(limit) => newest_first.take(limit.max(0) as usize).collect(),
            None => newest_first.collect(),
        })
    }

    async fn find_audit(&self, user_id: Uuid, audit_id: Uuid) -> StoreResult<Option<Audit>> {
        Ok(self
            .audits
            .read()
            .await
            .iter()
            .find(|a| a.id == audit_id && a.user_id == user_id)
            .cloned())
    }
}
