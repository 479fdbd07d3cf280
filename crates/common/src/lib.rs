//! Shared value types for the order saga system.

mod money;
mod types;

pub use money::Money;
pub use types::{ItemId, OrderId, PaymentId, ShipmentId};
