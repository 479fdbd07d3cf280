//! Order entity and its state machine.

mod entity;
mod state;

pub use entity::Order;
pub use state::OrderStatus;
