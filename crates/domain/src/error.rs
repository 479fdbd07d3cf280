//! Domain error types.

use common::ItemId;
use thiserror::Error;

/// Errors raised by entity factories and state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An input failed validation (non-positive amount, zero quantity, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A decrement asked for more units than the item has in stock.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// The entity's current status does not allow the requested action.
    #[error("Invalid state transition: cannot {action} {entity} in {from} state")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        action: &'static str,
    },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DomainError::InvalidArgument(message.into())
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
