//! Defensive field extraction from Stripe subscription and invoice objects
//!
//! Stripe has moved fields between API versions (`current_period_end` moved
//! from the subscription onto its items; the invoice's subscription moved
//! under `parent.subscription_details`). Objects are therefore read as raw
//! JSON and each value is looked up in every known location.

use serde_json::Value;
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};

/// Billing-relevant fields of one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub customer_id: String,
    pub price_id: String,
    pub current_period_end: OffsetDateTime,
}

impl SubscriptionSnapshot {
    pub fn from_value(subscription: &Value) -> BillingResult<Self> {
        let id = subscription
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BillingError::WebhookPayloadInvalid("subscription has no id".to_string())
            })?
            .to_string();

        let customer_id = subscription
            .get("customer")
            .and_then(expandable_id)
            .ok_or_else(|| BillingError::SubscriptionFieldMissing(id.clone(), "customer"))?
            .to_string();

        let price_id = first_item(subscription)
            .and_then(|item| item.get("price"))
            .and_then(expandable_id)
            .ok_or_else(|| BillingError::SubscriptionFieldMissing(id.clone(), "price"))?
            .to_string();

        let current_period_end =
            period_end(subscription).ok_or_else(|| BillingError::PeriodEndUnavailable(id.clone()))?;

        Ok(Self {
            id,
            customer_id,
            price_id,
            current_period_end,
        })
    }
}

/// End of the current billing period.
///
/// Checked in order: `current_period_end` on the subscription (older API
/// versions), then on the first subscription item (newer versions).
pub fn period_end(subscription: &Value) -> Option<OffsetDateTime> {
    let unix = subscription
        .get("current_period_end")
        .and_then(positive_timestamp)
        .or_else(|| {
            first_item(subscription)
                .and_then(|item| item.get("current_period_end"))
                .and_then(positive_timestamp)
        })?;

    OffsetDateTime::from_unix_timestamp(unix).ok()
}

/// Subscription an invoice was issued for.
///
/// Checked in order: `subscription`, `parent.subscription_details.subscription`,
/// `parent.subscription_details.subscription_id`. Each may be an id or an
/// expanded object.
pub fn invoice_subscription_id(invoice: &Value) -> Option<String> {
    let details = invoice
        .get("parent")
        .and_then(|parent| parent.get("subscription_details"));

    invoice
        .get("subscription")
        .and_then(expandable_id)
        .or_else(|| {
            details
                .and_then(|d| d.get("subscription"))
                .and_then(expandable_id)
        })
        .or_else(|| {
            details
                .and_then(|d| d.get("subscription_id"))
                .and_then(expandable_id)
        })
        .map(str::to_string)
}

/// Id of a Stripe "expandable" field: either the id string itself or an
/// expanded object carrying `id`
pub fn expandable_id(value: &Value) -> Option<&str> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.as_str()),
        Value::Object(object) => object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty()),
        _ => None,
    }
}

fn first_item(subscription: &Value) -> Option<&Value> {
    subscription
        .get("items")
        .and_then(|items| items.get("data"))
        .and_then(Value::as_array)
        .and_then(|data| data.first())
}

fn positive_timestamp(value: &Value) -> Option<i64> {
    value.as_i64().filter(|t| *t > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERIOD_END: i64 = 1_767_225_600;

    #[test]
    fn test_period_end_top_level() {
        let sub = json!({ "id": "sub_1", "current_period_end": PERIOD_END });
        assert_eq!(period_end(&sub).unwrap().unix_timestamp(), PERIOD_END);
    }

    #[test]
    fn test_period_end_on_first_item() {
        let sub = json!({
            "id": "sub_1",
            "items": { "data": [ { "id": "si_1", "current_period_end": PERIOD_END } ] }
        });
        assert_eq!(period_end(&sub).unwrap().unix_timestamp(), PERIOD_END);
    }

    #[test]
    fn test_period_end_top_level_wins_over_item() {
        let sub = json!({
            "id": "sub_1",
            "current_period_end": PERIOD_END,
            "items": { "data": [ { "current_period_end": PERIOD_END + 10 } ] }
        });
        assert_eq!(period_end(&sub).unwrap().unix_timestamp(), PERIOD_END);
    }

    #[test]
    fn test_period_end_null_top_level_falls_back_to_item() {
        let sub = json!({
            "id": "sub_1",
            "current_period_end": null,
            "items": { "data": [ { "current_period_end": PERIOD_END } ] }
        });
        assert_eq!(period_end(&sub).unwrap().unix_timestamp(), PERIOD_END);
    }

    #[test]
    fn test_period_end_missing_everywhere() {
        assert!(period_end(&json!({ "id": "sub_1" })).is_none());
        assert!(period_end(&json!({ "id": "sub_1", "items": { "data": [] } })).is_none());
        assert!(period_end(&json!({ "id": "sub_1", "current_period_end": 0 })).is_none());
    }

    #[test]
    fn test_snapshot_requires_period_end() {
        let sub = json!({
            "id": "sub_1",
            "customer": "cus_1",
            "items": { "data": [ { "price": { "id": "price_pro" } } ] }
        });
        let err = SubscriptionSnapshot::from_value(&sub).unwrap_err();
        assert!(matches!(err, BillingError::PeriodEndUnavailable(id) if id == "sub_1"));
    }

    #[test]
    fn test_snapshot_accepts_expanded_customer() {
        let sub = json!({
            "id": "sub_1",
            "customer": { "id": "cus_1", "email": "a@example.com" },
            "items": { "data": [ { "price": { "id": "price_pro" }, "current_period_end": PERIOD_END } ] }
        });
        let snapshot = SubscriptionSnapshot::from_value(&sub).unwrap();
        assert_eq!(snapshot.customer_id, "cus_1");
        assert_eq!(snapshot.price_id, "price_pro");
        assert_eq!(snapshot.current_period_end.unix_timestamp(), PERIOD_END);
    }

    #[test]
    fn test_snapshot_without_price_fails() {
        let sub = json!({
            "id": "sub_1",
            "customer": "cus_1",
            "current_period_end": PERIOD_END,
            "items": { "data": [] }
        });
        let err = SubscriptionSnapshot::from_value(&sub).unwrap_err();
        assert!(matches!(err, BillingError::SubscriptionFieldMissing(_, "price")));
    }

    #[test]
    fn test_invoice_subscription_legacy_field() {
        let invoice = json!({ "id": "in_1", "subscription": "sub_legacy" });
        assert_eq!(invoice_subscription_id(&invoice).as_deref(), Some("sub_legacy"));
    }

    #[test]
    fn test_invoice_subscription_under_parent() {
        let invoice = json!({
            "id": "in_1",
            "subscription": null,
            "parent": {
                "type": "subscription_details",
                "subscription_details": { "subscription": "sub_new" }
            }
        });
        assert_eq!(invoice_subscription_id(&invoice).as_deref(), Some("sub_new"));
    }

    #[test]
    fn test_invoice_subscription_id_variant() {
        let invoice = json!({
            "id": "in_1",
            "parent": { "subscription_details": { "subscription_id": "sub_alt" } }
        });
        assert_eq!(invoice_subscription_id(&invoice).as_deref(), Some("sub_alt"));
    }

    #[test]
    fn test_invoice_without_subscription() {
        let invoice = json!({ "id": "in_1", "parent": null });
        assert!(invoice_subscription_id(&invoice).is_none());
    }
}
