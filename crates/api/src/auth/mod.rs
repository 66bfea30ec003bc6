//! Authentication module for FlowAudit

pub mod jwt;
pub mod middleware;
#[cfg(test)]
mod middleware_tests;

pub use jwt::{Claims, IdentityVerifier};
pub use middleware::{require_auth, AuthError, AuthState, AuthUser, SESSION_COOKIE};
