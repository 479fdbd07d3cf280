use async_trait::async_trait;
use common::{ItemId, OrderId, PaymentId, ShipmentId};
use domain::{Order, OrderStatus, Payment, PaymentStatus, Shipment, StockItem};

use crate::{Result, StoreError};

/// Entry point of a storage backend: hands out units of work.
///
/// Implementations are cheap to clone and safe to share between tasks.
#[async_trait]
pub trait Store: Send + Sync {
    type Uow: UnitOfWork;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Uow>;
}

/// The smallest scope within which a set of mutations commits or rolls back
/// atomically.
///
/// Reads see committed rows plus this unit's own staged writes. The `lock_*`
/// methods take an exclusive lock on the row, waiting at most the backend's
/// lock timeout before failing with [`StoreError::LockTimeout`]. Locks are
/// released when the unit of work ends, never individually. Taking a lock
/// this unit of work already holds returns immediately.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// its writes.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    async fn find_item(&mut self, id: ItemId) -> Result<Option<StockItem>>;

    /// Loads a stock record under an exclusive lock.
    async fn lock_item(&mut self, id: ItemId) -> Result<Option<StockItem>>;

    async fn save_item(&mut self, item: &StockItem) -> Result<()>;

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order under an exclusive lock.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    async fn save_order(&mut self, order: &Order) -> Result<()>;

    /// Returns true if any order for `item_id` is in `status`.
    async fn order_exists_with_status(
        &mut self,
        item_id: ItemId,
        status: OrderStatus,
    ) -> Result<bool>;

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>>;

    /// Loads a payment under an exclusive lock.
    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>>;

    async fn save_payment(&mut self, payment: &Payment) -> Result<()>;

    /// Returns true if any payment for `order_id` is in `status`.
    async fn payment_exists_with_status(
        &mut self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<bool>;

    /// Payments for an order, oldest first.
    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Payment>>;

    async fn find_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>>;

    /// Loads a shipment under an exclusive lock.
    async fn lock_shipment(&mut self, id: ShipmentId) -> Result<Option<Shipment>>;

    async fn save_shipment(&mut self, shipment: &Shipment) -> Result<()>;

    /// Shipments for an order, oldest first.
    async fn shipments_for_order(&mut self, order_id: OrderId) -> Result<Vec<Shipment>>;

    /// Publishes every staged write and releases held locks.
    async fn commit(self) -> Result<()>;

    /// Discards every staged write and releases held locks.
    async fn rollback(self) -> Result<()>;
}

/// Ends a unit of work according to `result`: commit on `Ok`, roll back on
/// `Err`.
///
/// A failed rollback is logged and the original error is returned, since the
/// backend discards the writes anyway once the unit of work is gone.
pub async fn settle<U, T, E>(uow: U, result: std::result::Result<T, E>) -> std::result::Result<T, E>
where
    U: UnitOfWork,
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Extension trait providing convenience methods for stores.
///
/// Each method runs in a unit of work of its own.
#[async_trait]
pub trait StoreExt: Store {
    /// Persists a new stock record (catalog seeding).
    async fn insert_stock_item(&self, item: &StockItem) -> Result<()> {
        let mut uow = self.begin().await?;
        let result = uow.save_item(item).await;
        settle(uow, result).await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<StockItem>> {
        let mut uow = self.begin().await?;
        let result = uow.find_item(id).await;
        settle(uow, result).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut uow = self.begin().await?;
        let result = uow.find_order(id).await;
        settle(uow, result).await
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let mut uow = self.begin().await?;
        let result = uow.find_payment(id).await;
        settle(uow, result).await
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        let mut uow = self.begin().await?;
        let result = uow.find_shipment(id).await;
        settle(uow, result).await
    }

    async fn list_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let mut uow = self.begin().await?;
        let result = uow.payments_for_order(order_id).await;
        settle(uow, result).await
    }

    async fn list_shipments_for_order(&self, order_id: OrderId) -> Result<Vec<Shipment>> {
        let mut uow = self.begin().await?;
        let result = uow.shipments_for_order(order_id).await;
        settle(uow, result).await
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
