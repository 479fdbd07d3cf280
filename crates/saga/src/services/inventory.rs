//! Inventory lock manager: stock mutation under an exclusive row lock.

use common::ItemId;
use domain::StockItem;
use store::{Store, UnitOfWork, settle};

use crate::error::{Result, ServiceError};

/// Serializes stock changes per item.
///
/// Every mutation locks the stock record first. The lock belongs to the
/// enclosing unit of work and is released when it commits or rolls back, so
/// the new quantity becomes visible together with the lock release.
#[derive(Clone)]
pub struct InventoryLockManager<S> {
    store: S,
}

impl<S: Store> InventoryLockManager<S> {
    /// Creates a new lock manager.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads a stock record under an exclusive lock held by `uow`.
    ///
    /// Contention surfaces as a retryable `LockTimeout`.
    pub async fn find_item_with_lock(&self, uow: &mut S::Uow, item_id: ItemId) -> Result<StockItem> {
        uow.lock_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("stock item", item_id))
    }

    /// Locks the item in `uow` and removes `quantity` units.
    pub async fn decrement_in(
        &self,
        uow: &mut S::Uow,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<StockItem> {
        let mut item = self.find_item_with_lock(uow, item_id).await?;
        item.decrease_stock(quantity)?;
        uow.save_item(&item).await?;
        Ok(item)
    }

    /// Locks the item in `uow` and returns `quantity` units.
    pub async fn increment_in(
        &self,
        uow: &mut S::Uow,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<StockItem> {
        let mut item = self.find_item_with_lock(uow, item_id).await?;
        item.increase_stock(quantity)?;
        uow.save_item(&item).await?;
        Ok(item)
    }

    /// Removes `quantity` units in a unit of work of its own.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_and_decrement(&self, item_id: ItemId, quantity: u32) -> Result<StockItem> {
        let mut uow = self.store.begin().await?;
        let result = self.decrement_in(&mut uow, item_id, quantity).await;
        settle(uow, result).await
    }

    /// Returns `quantity` units in a unit of work of its own.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_and_increment(&self, item_id: ItemId, quantity: u32) -> Result<StockItem> {
        let mut uow = self.store.begin().await?;
        let result = self.increment_in(&mut uow, item_id, quantity).await;
        settle(uow, result).await
    }

    pub async fn decrease_stock(&self, item_id: ItemId, quantity: u32) -> Result<StockItem> {
        self.acquire_and_decrement(item_id, quantity).await
    }

    /// Restores stock. A zero quantity is rejected as an invalid argument.
    pub async fn increase_stock(&self, item_id: ItemId, quantity: u32) -> Result<StockItem> {
        self.acquire_and_increment(item_id, quantity).await
    }

    /// Reads a stock record without locking it.
    pub async fn get_item(&self, item_id: ItemId) -> Result<StockItem> {
        let mut uow = self.store.begin().await?;
        let result = uow.find_item(item_id).await.map_err(ServiceError::from);
        settle(uow, result)
            .await?
            .ok_or_else(|| ServiceError::not_found("stock item", item_id))
    }
}
