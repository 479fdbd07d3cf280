//! Payment entity and its state machine.

mod entity;
mod state;

pub use entity::Payment;
pub use state::PaymentStatus;
