//! Notification events pushed to admin dashboards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::envelope::unwrap_data;
use crate::types::id::OrderId;

/// Emitted once when an order is created through the gateway.
///
/// Ephemeral: never persisted, never replayed to late subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// ID of the new order, when the backend reported one.
    pub id: Option<OrderId>,
    /// Emission time in milliseconds since the Unix epoch.
    pub at: i64,
}

impl OrderCreated {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn now(id: Option<OrderId>) -> Self {
        Self {
            id,
            at: Utc::now().timestamp_millis(),
        }
    }

    /// Build an event from a backend order-creation response body.
    ///
    /// Looks for `id` (or `_id`) on the payload, unwrapping `data` and a
    /// nested `order` object when present. A body without a usable ID still
    /// produces an event, with `id: null`.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        let payload = unwrap_data(body);
        let order = payload.get("order").unwrap_or(payload);
        let id = order
            .get("id")
            .or_else(|| order.get("_id"))
            .and_then(|raw| serde_json::from_value::<OrderId>(raw.clone()).ok());
        Self::now(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_wrapped_response() {
        let event = OrderCreated::from_response(&json!({"success": true, "data": {"id": "ord_9"}}));
        assert_eq!(event.id, Some(OrderId::new("ord_9")));
        assert!(event.at > 0);
    }

    #[test]
    fn test_from_nested_order_with_numeric_id() {
        let event = OrderCreated::from_response(&json!({"data": {"order": {"id": 77}}}));
        assert_eq!(event.id, Some(OrderId::new("77")));
    }

    #[test]
    fn test_missing_id_serializes_as_null() {
        let event = OrderCreated::from_response(&json!(null));
        assert_eq!(event.id, None);
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["id"], Value::Null);
        assert_eq!(encoded["at"], json!(event.at));
    }
}
