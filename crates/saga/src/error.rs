//! Service and saga error types.

use std::fmt;

use common::{ItemId, OrderId};
use domain::DomainError;
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Errors raised by the lifecycle services and the compensation handler.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A pending order already exists for the item.
    #[error("A pending order already exists for item {item_id}")]
    DuplicateOrder { item_id: ItemId },

    /// A completed payment already exists for the order.
    #[error("A completed payment already exists for order {order_id}")]
    DuplicatePayment { order_id: OrderId },

    /// A step returned without error but its result is not what the saga
    /// requires.
    #[error("Postcondition of step '{step}' not met: {detail}")]
    Postcondition { step: &'static str, detail: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn postcondition(step: &'static str, detail: impl Into<String>) -> Self {
        ServiceError::Postcondition {
            step,
            detail: detail.into(),
        }
    }

    /// Classifies the error for callers and transports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::DuplicateOrder { .. } => ErrorKind::DuplicateOrder,
            ServiceError::DuplicatePayment { .. } => ErrorKind::DuplicatePayment,
            ServiceError::Postcondition { .. } => ErrorKind::Postcondition,
            ServiceError::Domain(DomainError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            ServiceError::Domain(DomainError::InsufficientStock { .. }) => {
                ErrorKind::InsufficientStock
            }
            ServiceError::Domain(DomainError::InvalidTransition { .. }) => {
                ErrorKind::InvalidTransition
            }
            ServiceError::Store(StoreError::LockTimeout { .. }) => ErrorKind::LockTimeout,
            ServiceError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

/// Errors surfaced by a saga run.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A step failed and every completed step was compensated.
    #[error("Saga step '{step}' failed: {source}")]
    StepFailed {
        step: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A step failed and then compensating one of the earlier steps failed
    /// too. The system is left in a known-inconsistent state.
    #[error(
        "Compensation of step '{compensation_step}' failed after step '{failed_step}' failed: {source} (original failure: {cause})"
    )]
    CompensationFailed {
        failed_step: &'static str,
        compensation_step: &'static str,
        #[source]
        source: ServiceError,
        cause: Box<ServiceError>,
    },
}

impl SagaError {
    /// The step whose forward action failed.
    pub fn failed_step(&self) -> &'static str {
        match self {
            SagaError::StepFailed { step, .. } => *step,
            SagaError::CompensationFailed { failed_step, .. } => *failed_step,
        }
    }

    /// The kind of the original failure, or `CompensationFailed`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SagaError::StepFailed { source, .. } => source.kind(),
            SagaError::CompensationFailed { .. } => ErrorKind::CompensationFailed,
        }
    }
}

/// Flat classification of every error the crate surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InsufficientStock,
    DuplicateOrder,
    DuplicatePayment,
    InvalidTransition,
    LockTimeout,
    Postcondition,
    CompensationFailed,
    Infrastructure,
}

impl ErrorKind {
    /// Only lock contention is worth retrying automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::LockTimeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::DuplicateOrder => "DUPLICATE_ORDER",
            ErrorKind::DuplicatePayment => "DUPLICATE_PAYMENT",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::LockTimeout => "LOCK_TIMEOUT",
            ErrorKind::Postcondition => "POSTCONDITION",
            ErrorKind::CompensationFailed => "COMPENSATION_FAILED",
            ErrorKind::Infrastructure => "INFRASTRUCTURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_kind_of_domain_errors() {
        let err = ServiceError::from(DomainError::invalid_argument("bad"));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = ServiceError::from(DomainError::InsufficientStock {
            item_id: ItemId::new(),
            requested: 5,
            available: 1,
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err = ServiceError::from(DomainError::InvalidTransition {
            entity: "order",
            from: "PAID",
            action: "pay",
        });
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        let err = ServiceError::from(StoreError::LockTimeout {
            resource: "stock_items/x".to_string(),
            waited: Duration::from_secs(3),
        });
        assert_eq!(err.kind(), ErrorKind::LockTimeout);
        assert!(err.kind().is_retryable());

        assert!(!ServiceError::from(StoreError::Poisoned).kind().is_retryable());
        assert_eq!(
            ServiceError::from(StoreError::Poisoned).kind(),
            ErrorKind::Infrastructure
        );
        assert!(!ErrorKind::InsufficientStock.is_retryable());
    }

    #[test]
    fn test_step_failure_keeps_original_kind_and_message() {
        let err = SagaError::StepFailed {
            step: "create_order",
            source: ServiceError::DuplicateOrder {
                item_id: ItemId::new(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::DuplicateOrder);
        assert_eq!(err.failed_step(), "create_order");
        assert!(err.to_string().contains("pending order already exists"));
    }

    #[test]
    fn test_compensation_failure_is_distinct() {
        let err = SagaError::CompensationFailed {
            failed_step: "create_shipment",
            compensation_step: "create_payment",
            source: ServiceError::from(DomainError::InvalidTransition {
                entity: "payment",
                from: "COMPLETED",
                action: "cancel",
            }),
            cause: Box::new(ServiceError::postcondition("create_shipment", "boom")),
        };
        assert_eq!(err.kind(), ErrorKind::CompensationFailed);
        assert_eq!(err.failed_step(), "create_shipment");
        assert!(!err.kind().is_retryable());
    }
}
