//! Lifecycle services. Each public operation runs in a unit of work of its
//! own and commits or rolls back before returning.

pub mod inventory;
pub mod order;
pub mod payment;
pub mod shipment;

pub use inventory::InventoryLockManager;
pub use order::OrderService;
pub use payment::PaymentService;
pub use shipment::ShipmentService;

use store::Store;

use crate::compensation::CompensationHandler;

/// Every service over one store.
#[derive(Clone)]
pub struct Services<S> {
    pub inventory: InventoryLockManager<S>,
    pub orders: OrderService<S>,
    pub payments: PaymentService<S>,
    pub shipments: ShipmentService<S>,
    pub compensation: CompensationHandler<S>,
}

impl<S: Store + Clone> Services<S> {
    pub fn new(store: S) -> Self {
        let orders = OrderService::new(store.clone());
        let payments = PaymentService::new(store.clone());
        let shipments = ShipmentService::new(store.clone());
        Self {
            inventory: InventoryLockManager::new(store),
            compensation: CompensationHandler::new(orders.clone(), payments.clone(), shipments.clone()),
            orders,
            payments,
            shipments,
        }
    }
}
