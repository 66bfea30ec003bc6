//! PostgreSQL implementation of [`AccountStore`]

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Audit, BillingSnapshot, NewAudit, SubscriptionLink, SubscriptionRenewal, UsageSnapshot, User,
};
use crate::store::AccountStore;

/// Row type for the combined billing + usage read
#[derive(Debug, FromRow)]
struct UsageRow {
    id: Uuid,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    stripe_price_id: Option<String>,
    stripe_current_period_end: Option<OffsetDateTime>,
    audits_used: i64,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn upsert_user(&self, identity_id: &str, email: &str) -> StoreResult<User> {
        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (id, identity_id, email, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (identity_id) DO UPDATE SET
                email = EXCLUDED.email,
                updated_at = NOW()
            RETURNING id, identity_id, email, stripe_customer_id, stripe_subscription_id,
                      stripe_price_id, stripe_current_period_end, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(identity_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, identity_id, email, stripe_customer_id, stripe_subscription_id,
                   stripe_price_id, stripe_current_period_end, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_identity(&self, identity_id: &str) -> StoreResult<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, identity_id, email, stripe_customer_id, stripe_subscription_id,
                   stripe_price_id, stripe_current_period_end, created_at, updated_at
            FROM users
            WHERE identity_id = $1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn usage_snapshot(&self, user_id: Uuid) -> StoreResult<Option<UsageSnapshot>> {
        let row: Option<UsageRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.stripe_customer_id, u.stripe_subscription_id, u.stripe_price_id,
                   u.stripe_current_period_end,
                   (SELECT COUNT(*) FROM audits a WHERE a.user_id = u.id) AS audits_used
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UsageSnapshot {
            user_id: row.id,
            billing: BillingSnapshot {
                customer_id: row.stripe_customer_id,
                subscription_id: row.stripe_subscription_id,
                price_id: row.stripe_price_id,
                current_period_end: row.stripe_current_period_end,
            },
            audits_used: row.audits_used,
        }))
    }

    async fn count_audits(&self, user_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audits WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn link_subscription(
        &self,
        user_id: Uuid,
        link: &SubscriptionLink,
    ) -> StoreResult<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users SET
                stripe_subscription_id = $2,
                stripe_customer_id = $3,
                stripe_price_id = $4,
                stripe_current_period_end = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, identity_id, email, stripe_customer_id, stripe_subscription_id,
                      stripe_price_id, stripe_current_period_end, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&link.subscription_id)
        .bind(&link.customer_id)
        .bind(&link.price_id)
        .bind(link.current_period_end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn renew_subscription(
        &self,
        subscription_id: &str,
        renewal: &SubscriptionRenewal,
    ) -> StoreResult<Option<User>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            UPDATE users SET
                stripe_price_id = $2,
                stripe_current_period_end = $3,
                updated_at = NOW()
            WHERE stripe_subscription_id = $1
            RETURNING id, identity_id, email, stripe_customer_id, stripe_subscription_id,
                      stripe_price_id, stripe_current_period_end, created_at, updated_at
            "#,
        )
        .bind(subscription_id)
        .bind(&renewal.price_id)
        .bind(renewal.current_period_end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_audit(&self, audit: NewAudit) -> StoreResult<Audit> {
        let audit: Audit = sqlx::query_as(
            r#"
            INSERT INTO audits (id, user_id, original_input, analysis_report, workflow_json, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, user_id, original_input, analysis_report, workflow_json, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(audit.user_id)
        .bind(&audit.original_input)
        .bind(&audit.analysis_report)
        .bind(&audit.workflow_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(audit)
    }

    async fn list_audits(&self, user_id: Uuid, limit: Option<i64>) -> StoreResult<Vec<Audit>> {
        // LIMIT NULL means no limit in PostgreSQL
        let audits: Vec<Audit> = sqlx::query_as(
            r#"
            SELECT id, user_id, original_input, analysis_report, workflow_json, created_at
            FROM audits
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(audits)
    }

    async fn find_audit(&self, user_id: Uuid, audit_id: Uuid) -> StoreResult<Option<Audit>> {
        let audit: Option<Audit> = sqlx::query_as(
            r#"
            SELECT id, user_id, original_input, analysis_report, workflow_json, created_at
            FROM audits
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(audit_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(audit)
    }
}
