//! Shipment state machine.

use serde::{Deserialize, Serialize};

use crate::status::{Status, status_strings};

/// The status of a shipment.
///
/// State transitions:
/// ```text
/// Pending ──► Shipped ──► Delivered
///    │           │
///    └───────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Created, awaiting dispatch.
    #[default]
    Pending,

    /// Dispatched to the carrier.
    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Withdrawn before delivery (terminal state).
    Cancelled,
}

status_strings!(ShipmentStatus {
    Pending => "PENDING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

impl Status for ShipmentStatus {
    const ENTITY: &'static str = "shipment";

    fn allowed_next(&self) -> &'static [Self] {
        match self {
            ShipmentStatus::Pending => &[ShipmentStatus::Shipped, ShipmentStatus::Cancelled],
            ShipmentStatus::Shipped => &[ShipmentStatus::Delivered, ShipmentStatus::Cancelled],
            ShipmentStatus::Delivered | ShipmentStatus::Cancelled => &[],
        }
    }

    fn as_str(&self) -> &'static str {
        self.name()
    }
}
