//! Order entity.

use chrono::{DateTime, Utc};
use common::{ItemId, Money, OrderId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::error::{DomainError, Result};
use crate::status::Status;
use crate::stock::StockItem;

/// An order for a quantity of a single stock item.
///
/// `total_amount` is fixed at creation; afterwards only `status` changes,
/// and only along the edges in [`OrderStatus::allowed_next`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    item_id: ItemId,
    quantity: u32,
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order for `quantity` units of `item`.
    ///
    /// Stock is not touched here; the caller decrements it under the
    /// item's lock in the same unit of work.
    pub fn create(item: &StockItem, quantity: u32) -> Result<Self> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument(
                "order quantity must be greater than 0",
            ));
        }
        let total_amount = item.price().checked_multiply(quantity).ok_or_else(|| {
            DomainError::invalid_argument(format!(
                "order total overflows for {} x {}",
                item.price(),
                quantity
            ))
        })?;

        Ok(Self {
            id: OrderId::new(),
            item_id: item.id(),
            quantity,
            total_amount,
            status: OrderStatus::Pending,
            created_at: crate::clock::now(),
        })
    }

    /// Rebuilds an order from persisted fields without validation.
    pub fn from_parts(
        id: OrderId,
        item_id: ItemId,
        quantity: u32,
        total_amount: Money,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            item_id,
            quantity,
            total_amount,
            status,
            created_at,
        }
    }

    /// Marks the order paid. Only a pending order can be paid.
    pub fn pay(&mut self) -> Result<()> {
        self.status = self.status.transition(OrderStatus::Paid, "pay")?;
        Ok(())
    }

    /// Marks the order shipped. Only a paid order can be shipped.
    pub fn ship(&mut self) -> Result<()> {
        self.status = self.status.transition(OrderStatus::Shipped, "ship")?;
        Ok(())
    }

    /// Cancels the order. Only a pending order can be cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        self.status = self.status.transition(OrderStatus::Cancelled, "cancel")?;
        Ok(())
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
