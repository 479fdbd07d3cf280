//! Domain layer for the order saga system.
//!
//! This crate holds the entities and their rules, with no I/O:
//! - `StockItem` with non-negative stock and guarded decrements
//! - `Order`, `Payment` and `Shipment`, each with a status enum whose legal
//!   moves are an explicit transition table (see [`Status`])
//! - validating factories that return `Result` instead of panicking

mod clock;
pub mod error;
pub mod order;
pub mod payment;
pub mod shipment;
pub mod status;
pub mod stock;

pub use error::DomainError;
pub use order::{Order, OrderStatus};
pub use payment::{Payment, PaymentStatus};
pub use shipment::{Shipment, ShipmentStatus};
pub use status::{ParseStatusError, Status};
pub use stock::StockItem;
