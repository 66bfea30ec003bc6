// API crate clippy configuration
#![allow(clippy::needless_borrows_for_generic_args)] // Sometimes needed for clarity
// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! FlowAudit API Library
//!
//! HTTP surface for FlowAudit: identity verification, audit generation,
//! history and downloads, and the Stripe billing endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod llm;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
