//! Shipment lifecycle.

use common::{OrderId, ShipmentId};
use domain::{DomainError, OrderStatus, Shipment, Status};
use store::{Store, UnitOfWork, settle};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Creates shipments for paid orders and advances them through their
/// lifecycle.
#[derive(Clone)]
pub struct ShipmentService<S> {
    store: S,
}

impl<S: Store> ShipmentService<S> {
    /// Creates a new shipment service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records a pending shipment for a paid order.
    #[tracing::instrument(skip(self))]
    pub async fn create_shipment(&self, order_id: OrderId) -> Result<Shipment> {
        let mut uow = self.store.begin().await?;
        let result = self.create_shipment_in(&mut uow, order_id).await;
        settle(uow, result).await
    }

    async fn create_shipment_in(&self, uow: &mut S::Uow, order_id: OrderId) -> Result<Shipment> {
        let order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))?;

        if order.status() != OrderStatus::Paid {
            return Err(DomainError::InvalidTransition {
                entity: OrderStatus::ENTITY,
                from: order.status().as_str(),
                action: "create a shipment for",
            }
            .into());
        }

        let shipment = Shipment::create(order_id);
        uow.save_shipment(&shipment).await?;
        Ok(shipment)
    }

    /// Dispatches a pending shipment, assigning a tracking number.
    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, shipment_id: ShipmentId) -> Result<Shipment> {
        let tracking_number = next_tracking_number();
        let mut uow = self.store.begin().await?;
        let result = self
            .transition_in(&mut uow, shipment_id, |s| s.ship(tracking_number))
            .await;
        let shipment = settle(uow, result).await?;

        tracing::info!(
            %shipment_id,
            tracking_number = shipment.tracking_number().unwrap_or_default(),
            "Shipment dispatched"
        );
        Ok(shipment)
    }

    /// Marks a dispatched shipment delivered.
    #[tracing::instrument(skip(self))]
    pub async fn complete_shipment(&self, shipment_id: ShipmentId) -> Result<Shipment> {
        let mut uow = self.store.begin().await?;
        let result = self
            .transition_in(&mut uow, shipment_id, Shipment::complete)
            .await;
        settle(uow, result).await
    }

    /// Cancels a shipment that has not been delivered.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_shipment(&self, shipment_id: ShipmentId) -> Result<Shipment> {
        let mut uow = self.store.begin().await?;
        let result = self
            .transition_in(&mut uow, shipment_id, Shipment::cancel)
            .await;
        settle(uow, result).await
    }

    async fn transition_in(
        &self,
        uow: &mut S::Uow,
        shipment_id: ShipmentId,
        apply: impl FnOnce(&mut Shipment) -> domain::error::Result<()> + Send,
    ) -> Result<Shipment> {
        let mut shipment = uow
            .lock_shipment(shipment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("shipment", shipment_id))?;
        apply(&mut shipment)?;
        uow.save_shipment(&shipment).await?;
        Ok(shipment)
    }

    pub async fn get_shipment(&self, shipment_id: ShipmentId) -> Result<Shipment> {
        let mut uow = self.store.begin().await?;
        let result = uow.find_shipment(shipment_id).await.map_err(ServiceError::from);
        settle(uow, result)
            .await?
            .ok_or_else(|| ServiceError::not_found("shipment", shipment_id))
    }

    /// Shipments recorded for an order, oldest first.
    pub async fn shipments_for_order(&self, order_id: OrderId) -> Result<Vec<Shipment>> {
        let mut uow = self.store.begin().await?;
        let result = uow
            .shipments_for_order(order_id)
            .await
            .map_err(ServiceError::from);
        settle(uow, result).await
    }
}

fn next_tracking_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TRK-{}", &id[..12])
}

#[cfg(test)]
mod tests {
    use common::Money;
    use domain::{Order, ShipmentStatus, StockItem};
    use store::{InMemoryStore, StoreExt};

    use super::*;
    use crate::error::ErrorKind;

    async fn setup(order_status: OrderStatus) -> (ShipmentService<InMemoryStore>, Order) {
        let store = InMemoryStore::new();
        let item = StockItem::new("Widget", 10, Money::from_cents(100), None).unwrap();
        store.insert_stock_item(&item).await.unwrap();

        let mut order = Order::create(&item, 1).unwrap();
        if order_status == OrderStatus::Paid {
            order.pay().unwrap();
        }
        let mut uow = store.begin().await.unwrap();
        uow.save_order(&order).await.unwrap();
        uow.commit().await.unwrap();

        (ShipmentService::new(store), order)
    }

    #[tokio::test]
    async fn test_create_requires_paid_order() {
        let (service, order) = setup(OrderStatus::Pending).await;
        let err = service.create_shipment(order.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(service.shipments_for_order(order.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_ship() {
        let (service, order) = setup(OrderStatus::Paid).await;

        let shipment = service.create_shipment(order.id()).await.unwrap();
        assert_eq!(shipment.status(), ShipmentStatus::Pending);

        let shipped = service.ship(shipment.id()).await.unwrap();
        assert_eq!(shipped.status(), ShipmentStatus::Shipped);
        assert!(shipped.tracking_number().unwrap().starts_with("TRK-"));
        assert!(shipped.dispatched_at().is_some());
        assert_eq!(service.get_shipment(shipment.id()).await.unwrap(), shipped);
    }

    #[tokio::test]
    async fn test_ship_twice_fails() {
        let (service, order) = setup(OrderStatus::Paid).await;
        let shipment = service.create_shipment(order.id()).await.unwrap();
        service.ship(shipment.id()).await.unwrap();

        let err = service.ship(shipment.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_complete_and_cancel_rules() {
        let (service, order) = setup(OrderStatus::Paid).await;
        let shipment = service.create_shipment(order.id()).await.unwrap();

        let err = service.complete_shipment(shipment.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        service.ship(shipment.id()).await.unwrap();
        let delivered = service.complete_shipment(shipment.id()).await.unwrap();
        assert_eq!(delivered.status(), ShipmentStatus::Delivered);

        let err = service.cancel_shipment(shipment.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_cancel_pending_shipment() {
        let (service, order) = setup(OrderStatus::Paid).await;
        let shipment = service.create_shipment(order.id()).await.unwrap();

        let cancelled = service.cancel_shipment(shipment.id()).await.unwrap();
        assert_eq!(cancelled.status(), ShipmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_shipment_not_found() {
        let (service, _) = setup(OrderStatus::Paid).await;
        let err = service.ship(ShipmentId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
