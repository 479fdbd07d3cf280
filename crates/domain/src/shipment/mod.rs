//! Shipment entity and its state machine.

mod entity;
mod state;

pub use entity::Shipment;
pub use state::ShipmentStatus;
