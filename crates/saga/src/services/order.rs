//! Order lifecycle.

use common::{ItemId, OrderId};
use domain::{Order, OrderStatus};
use store::{Store, UnitOfWork, settle};

use crate::error::{Result, ServiceError};
use crate::services::inventory::InventoryLockManager;

/// Creates orders against stock and advances them through their lifecycle.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
    inventory: InventoryLockManager<S>,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S) -> Self {
        Self {
            inventory: InventoryLockManager::new(store.clone()),
            store,
        }
    }

    /// Reserves `quantity` units of the item and records a pending order.
    ///
    /// The duplicate check runs under the item lock, so two concurrent calls
    /// for the same item cannot both pass it.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, item_id: ItemId, quantity: u32) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let result = self.create_order_in(&mut uow, item_id, quantity).await;
        let order = settle(uow, result).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id(), total = %order.total_amount(), "Order created");
        Ok(order)
    }

    async fn create_order_in(
        &self,
        uow: &mut S::Uow,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<Order> {
        let item = self.inventory.find_item_with_lock(uow, item_id).await?;

        if uow
            .order_exists_with_status(item_id, OrderStatus::Pending)
            .await?
        {
            return Err(ServiceError::DuplicateOrder { item_id });
        }

        let order = Order::create(&item, quantity)?;
        self.inventory.decrement_in(uow, item_id, quantity).await?;
        uow.save_order(&order).await?;
        Ok(order)
    }

    /// Moves a pending order to paid.
    #[tracing::instrument(skip(self))]
    pub async fn pay_for_order(&self, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let result = self.transition_in(&mut uow, order_id, Order::pay).await;
        settle(uow, result).await
    }

    /// Moves a paid order to shipped.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let result = self.transition_in(&mut uow, order_id, Order::ship).await;
        settle(uow, result).await
    }

    /// Cancels a pending order and restores its reserved stock.
    ///
    /// Locks the order, then the item.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let result = self.cancel_order_in(&mut uow, order_id).await;
        let order = settle(uow, result).await?;

        tracing::info!(%order_id, restored = order.quantity(), "Order cancelled");
        Ok(order)
    }

    async fn cancel_order_in(&self, uow: &mut S::Uow, order_id: OrderId) -> Result<Order> {
        let mut order = self.lock_order(uow, order_id).await?;
        order.cancel()?;
        self.inventory
            .increment_in(uow, order.item_id(), order.quantity())
            .await?;
        uow.save_order(&order).await?;
        Ok(order)
    }

    async fn transition_in(
        &self,
        uow: &mut S::Uow,
        order_id: OrderId,
        apply: fn(&mut Order) -> domain::error::Result<()>,
    ) -> Result<Order> {
        let mut order = self.lock_order(uow, order_id).await?;
        apply(&mut order)?;
        uow.save_order(&order).await?;
        Ok(order)
    }

    async fn lock_order(&self, uow: &mut S::Uow, order_id: OrderId) -> Result<Order> {
        uow.lock_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let result = uow.find_order(order_id).await.map_err(ServiceError::from);
        settle(uow, result)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))
    }

    /// The lock manager this service moves stock through.
    pub fn inventory(&self) -> &InventoryLockManager<S> {
        &self.inventory
    }
}
