//! Billing errors

use flowaudit_shared::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe API error: {0}")]
    Stripe(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Carries no detail on purpose: callers must not learn which part of
    /// the signature check failed
    #[error("Invalid webhook signature")]
    WebhookSignatureInvalid,

    #[error("Malformed webhook event: {0}")]
    WebhookPayloadInvalid(String),

    #[error("User id is required")]
    MissingUserReference,

    #[error("No subscription found on {0}")]
    MissingSubscriptionReference(&'static str),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No user holds subscription {0}")]
    SubscriptionNotFound(String),

    #[error("Could not determine period end for subscription {0}")]
    PeriodEndUnavailable(String),

    #[error("Subscription {0} is missing {1}")]
    SubscriptionFieldMissing(String, &'static str),

    #[error("No Stripe customer found")]
    NoCustomer,
}

pub type BillingResult<T> = Result<T, BillingError>;

impl BillingError {
    /// Failures caused by the event itself (bad signature, unknown references,
    /// malformed payload), as opposed to failures on our side
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BillingError::WebhookSignatureInvalid
                | BillingError::WebhookPayloadInvalid(_)
                | BillingError::MissingUserReference
                | BillingError::MissingSubscriptionReference(_)
                | BillingError::UserNotFound(_)
                | BillingError::SubscriptionNotFound(_)
        )
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::Stripe(err.to_string())
    }
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        BillingError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_error_message_has_no_detail() {
        assert_eq!(
            BillingError::WebhookSignatureInvalid.to_string(),
            "Invalid webhook signature"
        );
    }

    #[test]
    fn test_rejections_vs_internal_failures() {
        assert!(BillingError::UserNotFound("u".into()).is_rejection());
        assert!(BillingError::SubscriptionNotFound("sub".into()).is_rejection());
        assert!(BillingError::MissingUserReference.is_rejection());
        assert!(!BillingError::PeriodEndUnavailable("sub".into()).is_rejection());
        assert!(!BillingError::Database("down".into()).is_rejection());
        assert!(!BillingError::Stripe("500".into()).is_rejection());
    }
}
