//! Usage counter: audits generated by a user, derived from persisted history

use std::sync::Arc;

use flowaudit_shared::AccountStore;
use uuid::Uuid;

use crate::error::BillingResult;

#[derive(Clone)]
pub struct UsageCounter {
    store: Arc<dyn AccountStore>,
}

impl UsageCounter {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub async fn audits_used(&self, user_id: Uuid) -> BillingResult<i64> {
        Ok(self.store.count_audits(user_id).await?)
    }
}
