pub mod health;
pub mod items;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod sagas;
pub mod shipments;
