//! Storage capability shared by the gate, the orchestrator and the webhook reconciler

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Audit, NewAudit, SubscriptionLink, SubscriptionRenewal, UsageSnapshot, User,
};

/// Single-row reads and writes over users and audits.
///
/// Every mutation is a full-field overwrite or an insert, so no method needs
/// a multi-row transaction. Identity fields and billing fields are written by
/// disjoint methods.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create the user for `identity_id`, or refresh its email if it exists
    async fn upsert_user(&self, identity_id: &str, email: &str) -> StoreResult<User>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_identity(&self, identity_id: &str) -> StoreResult<Option<User>>;

    /// Billing snapshot and audit count from one read
    async fn usage_snapshot(&self, user_id: Uuid) -> StoreResult<Option<UsageSnapshot>>;

    async fn count_audits(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Overwrite all billing fields of `user_id`. Returns `None` if no such user.
    async fn link_subscription(
        &self,
        user_id: Uuid,
        link: &SubscriptionLink,
    ) -> StoreResult<Option<User>>;

    /// Overwrite price and period end on the user holding `subscription_id`.
    /// Returns `None` if no user holds it.
    async fn renew_subscription(
        &self,
        subscription_id: &str,
        renewal: &SubscriptionRenewal,
    ) -> StoreResult<Option<User>>;

    async fn insert_audit(&self, audit: NewAudit) -> StoreResult<Audit>;

    /// Audits of `user_id`, newest first
    async fn list_audits(&self, user_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Audit>>;

    /// One audit, only if owned by `user_id`
    async fn find_audit(&self, user_id: Uuid, audit_id: Uuid) -> StoreResult<Option<Audit>>;
}
