//! Shipment entity.

use chrono::{DateTime, Utc};
use common::{OrderId, ShipmentId};
use serde::{Deserialize, Serialize};

use super::ShipmentStatus;
use crate::error::{DomainError, Result};
use crate::status::Status;

/// A shipment for a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    id: ShipmentId,
    order_id: OrderId,
    status: ShipmentStatus,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
}

impl Shipment {
    /// Creates a pending shipment for an order.
    pub fn create(order_id: OrderId) -> Self {
        Self {
            id: ShipmentId::new(),
            order_id,
            status: ShipmentStatus::Pending,
            tracking_number: None,
            created_at: crate::clock::now(),
            dispatched_at: None,
        }
    }

    /// Rebuilds a shipment from persisted fields without validation.
    pub fn from_parts(
        id: ShipmentId,
        order_id: OrderId,
        status: ShipmentStatus,
        tracking_number: Option<String>,
        created_at: DateTime<Utc>,
        dispatched_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            order_id,
            status,
            tracking_number,
            created_at,
            dispatched_at,
        }
    }

    /// Dispatches the shipment, stamping the dispatch time.
    pub fn ship(&mut self, tracking_number: impl Into<String>) -> Result<()> {
        let tracking_number = tracking_number.into();
        if tracking_number.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "tracking number must not be empty",
            ));
        }
        self.status = self.status.transition(ShipmentStatus::Shipped, "ship")?;
        self.tracking_number = Some(tracking_number);
        self.dispatched_at = Some(crate::clock::now());
        Ok(())
    }

    /// Marks a dispatched shipment delivered.
    pub fn complete(&mut self) -> Result<()> {
        self.status = self
            .status
            .transition(ShipmentStatus::Delivered, "complete")?;
        Ok(())
    }

    /// Cancels the shipment. A delivered shipment cannot be cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        self.status = self
            .status
            .transition(ShipmentStatus::Cancelled, "cancel")?;
        Ok(())
    }

    pub fn id(&self) -> ShipmentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn dispatched_at(&self) -> Option<DateTime<Utc>> {
        self.dispatched_at
    }
}
