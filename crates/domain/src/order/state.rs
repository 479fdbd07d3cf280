//! Order state machine.

use serde::{Deserialize, Serialize};

use crate::status::{Status, status_strings};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Paid ──► Shipped
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Stock is reserved, payment outstanding.
    #[default]
    Pending,

    /// Payment confirmed.
    Paid,

    /// Handed to shipping; business completion of the order lifecycle.
    Shipped,

    /// Cancelled before payment; its stock was restored.
    Cancelled,
}

status_strings!(OrderStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Shipped => "SHIPPED",
    Cancelled => "CANCELLED",
});

impl Status for OrderStatus {
    const ENTITY: &'static str = "order";

    fn allowed_next(&self) -> &'static [Self] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Paid, OrderStatus::Cancelled],
            OrderStatus::Paid => &[OrderStatus::Shipped],
            OrderStatus::Shipped | OrderStatus::Cancelled => &[],
        }
    }

    fn as_str(&self) -> &'static str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_pending_can_pay_or_cancel() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_paid_can_only_ship() {
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_display_and_parse() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(*status, parsed);
        }
        assert_eq!(OrderStatus::Paid.to_string(), "PAID");
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }
}
