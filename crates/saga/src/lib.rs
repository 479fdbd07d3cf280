//! Order fulfillment as a saga over pessimistically locked stock.
//!
//! The order saga runs five locally committed steps:
//! 1. Create the order, reserving stock under the item's lock
//! 2. Create a pending payment
//! 3. Complete the payment and mark the order paid
//! 4. Create a shipment
//! 5. Dispatch the shipment
//!
//! If any step fails, previously completed steps are compensated in reverse order.

pub mod compensation;
pub mod coordinator;
pub mod error;
pub mod order_fulfillment;
pub mod runner;
pub mod services;
pub mod state;

pub use compensation::CompensationHandler;
pub use coordinator::{OrderSagaOrchestrator, OrderSagaOutcome};
pub use error::{ErrorKind, SagaError, ServiceError};
pub use order_fulfillment::OrderSagaContext;
pub use runner::{SagaRunner, SagaStep};
pub use services::{
    InventoryLockManager, OrderService, PaymentService, Services, ShipmentService,
};
pub use state::SagaState;
