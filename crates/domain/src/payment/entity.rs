//! Payment entity.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};

use super::PaymentStatus;
use crate::error::{DomainError, Result};
use crate::status::Status;

/// A payment against an order.
///
/// The order is referenced by id only. `created_at` is fixed at creation and
/// orders an order's payments; `updated_at` is refreshed on every status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    amount: Money,
    method: String,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a pending payment.
    pub fn create(order_id: OrderId, amount: Money, method: impl Into<String>) -> Result<Self> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_argument(format!(
                "payment amount must be greater than 0, got {amount}"
            )));
        }
        let method = method.into();
        if method.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "payment method must not be empty",
            ));
        }

        let now = crate::clock::now();
        Ok(Self {
            id: PaymentId::new(),
            order_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a payment from persisted fields without validation.
    pub fn from_parts(
        id: PaymentId,
        order_id: OrderId,
        amount: Money,
        method: String,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            amount,
            method,
            status,
            created_at,
            updated_at,
        }
    }

    /// Settles the payment.
    pub fn complete(&mut self) -> Result<()> {
        self.move_to(PaymentStatus::Completed, "complete")
    }

    /// Records a failed charge.
    pub fn fail(&mut self) -> Result<()> {
        self.move_to(PaymentStatus::Failed, "fail")
    }

    /// Voids the payment.
    pub fn cancel(&mut self) -> Result<()> {
        self.move_to(PaymentStatus::Cancelled, "cancel")
    }

    fn move_to(&mut self, next: PaymentStatus, action: &'static str) -> Result<()> {
        self.status = self.status.transition(next, action)?;
        self.updated_at = crate::clock::now();
        Ok(())
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
