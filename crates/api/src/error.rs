//! API error types with HTTP response mapping.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use saga::{ErrorKind, SagaError, ServiceError};

/// Seconds a client should wait before retrying after lock contention.
const RETRY_AFTER_SECS: &str = "1";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client, rejected before reaching a service.
    BadRequest(String),
    /// Lifecycle or compensation error.
    Service(ServiceError),
    /// Saga execution error.
    Saga(SagaError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::InvalidArgument,
            ApiError::Service(err) => err.kind(),
            ApiError::Saga(err) => err.kind(),
        }
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientStock
        | ErrorKind::DuplicateOrder
        | ErrorKind::DuplicatePayment
        | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Postcondition | ErrorKind::CompensationFailed | ErrorKind::Infrastructure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Service(err) => err.to_string(),
            ApiError::Saga(err) => err.to_string(),
        };

        metrics::counter!("http_errors_total", "kind" => kind.as_str()).increment(1);
        if status.is_server_error() && kind != ErrorKind::LockTimeout {
            tracing::error!(error = %message, %kind, "request failed");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        let mut response = (status, axum::Json(body)).into_response();
        if kind.is_retryable() {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<domain::DomainError> for ApiError {
    fn from(err: domain::DomainError) -> Self {
        ApiError::Service(err.into())
    }
}
