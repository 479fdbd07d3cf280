//! Reversing actions for a partially completed order saga.

use common::{ItemId, OrderId, PaymentId, ShipmentId};
use domain::{OrderStatus, Payment, PaymentStatus, ShipmentStatus};
use store::Store;

use crate::error::Result;
use crate::services::{OrderService, PaymentService, ShipmentService};

/// Undoes committed saga steps.
///
/// Each reversing call runs in its own unit of work. Errors are returned, not
/// swallowed: a failed compensation leaves the system inconsistent and needs
/// an operator.
#[derive(Clone)]
pub struct CompensationHandler<S> {
    orders: OrderService<S>,
    payments: PaymentService<S>,
    shipments: ShipmentService<S>,
}

impl<S: Store + Clone> CompensationHandler<S> {
    pub fn new(
        orders: OrderService<S>,
        payments: PaymentService<S>,
        shipments: ShipmentService<S>,
    ) -> Self {
        Self {
            orders,
            payments,
            shipments,
        }
    }

    /// Cancels `payment` unless it is already cancelled, then restores
    /// `quantity` units of stock for `item_id`.
    #[tracing::instrument(skip(self, payment), fields(payment_id = ?payment.map(Payment::id)))]
    pub async fn compensate(
        &self,
        item_id: ItemId,
        quantity: u32,
        payment: Option<&Payment>,
    ) -> Result<()> {
        if let Some(payment) = payment
            && payment.status() != PaymentStatus::Cancelled
        {
            self.cancel_payment(payment.id()).await?;
        }

        tracing::warn!(%item_id, quantity, "Compensation: restoring stock");
        self.orders
            .inventory()
            .increase_stock(item_id, quantity)
            .await?;
        Ok(())
    }

    /// Cancels a payment; a payment that is already cancelled is left alone.
    pub async fn cancel_payment(&self, payment_id: PaymentId) -> Result<()> {
        let payment = self.payments.get_payment(payment_id).await?;
        if payment.status() == PaymentStatus::Cancelled {
            return Ok(());
        }
        tracing::warn!(%payment_id, "Compensation: cancelling payment");
        self.payments.cancel_payment(payment_id).await?;
        Ok(())
    }

    /// Cancels a shipment; a shipment that is already cancelled is left alone.
    pub async fn cancel_shipment(&self, shipment_id: ShipmentId) -> Result<()> {
        let shipment = self.shipments.get_shipment(shipment_id).await?;
        if shipment.status() == ShipmentStatus::Cancelled {
            return Ok(());
        }
        tracing::warn!(%shipment_id, "Compensation: cancelling shipment");
        self.shipments.cancel_shipment(shipment_id).await?;
        Ok(())
    }

    /// Gives back the stock an order reserved.
    ///
    /// A pending order is cancelled, which restores its stock in the same
    /// unit of work. A paid or shipped order keeps its status and the stock
    /// is restored directly. A cancelled order already gave its stock back.
    pub async fn release_order(&self, order_id: OrderId) -> Result<()> {
        let order = self.orders.get_order(order_id).await?;
        match order.status() {
            OrderStatus::Pending => {
                tracing::warn!(%order_id, "Compensation: cancelling order");
                self.orders.cancel_order(order_id).await?;
            }
            OrderStatus::Cancelled => {}
            OrderStatus::Paid | OrderStatus::Shipped => {
                tracing::warn!(%order_id, status = %order.status(), "Compensation: restoring stock");
                self.orders
                    .inventory()
                    .increase_stock(order.item_id(), order.quantity())
                    .await?;
            }
        }
        Ok(())
    }
}
