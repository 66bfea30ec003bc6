//! Entitlement derivation and the free/paid generation gate
//!
//! Paid status is never stored. It is derived from the billing snapshot and
//! the current time on every check, so a lapsed subscription demotes the
//! user without any explicit downgrade.

use std::sync::Arc;

use flowaudit_shared::{AccountStore, BillingSnapshot};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// Generations allowed without an active subscription
pub const DEFAULT_FREE_AUDIT_LIMIT: i64 = 3;

/// True when the snapshot has a price, a period end, and the period end is
/// strictly after `now`
pub fn is_paid(snapshot: &BillingSnapshot, now: OffsetDateTime) -> bool {
    match (&snapshot.price_id, snapshot.current_period_end) {
        (Some(_), Some(period_end)) => period_end > now,
        _ => false,
    }
}

/// Model configuration selected for a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Pro,
    Free,
}

impl ModelTier {
    pub fn for_paid(is_paid: bool) -> Self {
        if is_paid {
            ModelTier::Pro
        } else {
            ModelTier::Free
        }
    }
}

/// Derived paid status plus usage, read from one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub is_paid: bool,
    pub audits_used: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub entitlement: Entitlement,
    pub allowed: bool,
    pub tier: ModelTier,
    pub free_limit: i64,
}

impl GateDecision {
    /// Free generations left; `None` for paid users
    pub fn remaining_free(&self) -> Option<i64> {
        if self.entitlement.is_paid {
            None
        } else {
            Some((self.free_limit - self.entitlement.audits_used).max(0))
        }
    }
}

/// Decides whether a user may run another generation.
///
/// Read-only. Concurrent requests from one user may each see the same count,
/// so a small over-allowance is possible; this is not a strict quota.
#[derive(Clone)]
pub struct EntitlementGate {
    store: Arc<dyn AccountStore>,
    free_limit: i64,
}

impl EntitlementGate {
    pub fn new(store: Arc<dyn AccountStore>, free_limit: i64) -> Self {
        Self { store, free_limit }
    }

    /// Pure decision rule: paid users are always allowed, others while under
    /// the free limit
    pub fn decide(&self, entitlement: Entitlement) -> GateDecision {
        let allowed = entitlement.is_paid || entitlement.audits_used < self.free_limit;
        GateDecision {
            entitlement,
            allowed,
            tier: ModelTier::for_paid(entitlement.is_paid),
            free_limit: self.free_limit,
        }
    }

    pub async fn evaluate(&self, user_id: Uuid) -> BillingResult<GateDecision> {
        self.evaluate_at(user_id, OffsetDateTime::now_utc()).await
    }

    pub async fn evaluate_at(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> BillingResult<GateDecision> {
        let snapshot = self
            .store
            .usage_snapshot(user_id)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;

        let decision = self.decide(Entitlement {
            is_paid: is_paid(&snapshot.billing, now),
            audits_used: snapshot.audits_used,
        });

        tracing::debug!(
            user_id = %user_id,
            is_paid = decision.entitlement.is_paid,
            audits_used = decision.entitlement.audits_used,
            allowed = decision.allowed,
            "Entitlement gate evaluated"
        );

        Ok(decision)
    }
}
