// Test code patterns:
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! FlowAudit shared storage layer
//!
//! Users and audits, the [`AccountStore`] capability and its PostgreSQL and
//! in-memory implementations.

pub mod db;
pub mod error;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod store;

pub use db::{create_migration_pool, create_pool, run_migrations};
pub use error::{StoreError, StoreResult};
pub use memory_store::InMemoryStore;
pub use models::{
    placeholder_email, Audit, BillingSnapshot, NewAudit, SubscriptionLink, SubscriptionRenewal, UsageSnapshot, User,
};
pub use pg_store::PgStore;
pub use store::AccountStore;
