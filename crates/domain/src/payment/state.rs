//! Payment state machine.

use serde::{Deserialize, Serialize};

use crate::status::{Status, status_strings};

/// The status of a payment.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Completed
///           ├──► Failed ──► Cancelled
///           └──► Cancelled
/// ```
///
/// Nothing leaves `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Requested, not yet settled.
    #[default]
    Pending,

    /// Settled successfully.
    Completed,

    /// The charge attempt failed.
    Failed,

    /// Voided before completion.
    Cancelled,
}

status_strings!(PaymentStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Cancelled => "CANCELLED",
});

impl Status for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn allowed_next(&self) -> &'static [Self] {
        match self {
            PaymentStatus::Pending => &[
                PaymentStatus::Completed,
                PaymentStatus::Failed,
                PaymentStatus::Cancelled,
            ],
            PaymentStatus::Failed => &[PaymentStatus::Cancelled],
            PaymentStatus::Completed | PaymentStatus::Cancelled => &[],
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
    fn test_pending_reaches_every_outcome() {
        for next in [
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert!(PaymentStatus::Pending.can_transition_to(next));
        }
    }

    #[test]
    fn test_completed_is_final() {
        assert!(PaymentStatus::Completed.is_terminal());
        for next in PaymentStatus::ALL {
            assert!(!PaymentStatus::Completed.can_transition_to(*next));
        }
    }

    #[test]
    fn test_failed_can_only_be_cancelled() {
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Cancelled));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Failed));
    }

    #[test]
    fn test_cancelled_is_final() {
        assert!(PaymentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_display_and_parse() {
        for status in PaymentStatus::ALL {
            let parsed: PaymentStatus = status.to_string().parse().unwrap();
            assert_eq!(*status, parsed);
        }
    }
}
