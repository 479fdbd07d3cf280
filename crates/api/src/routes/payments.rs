//! Payment lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, OrderId, PaymentId};
use domain::Payment;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Option<OrderId>,
    pub amount_cents: i64,
    pub method: String,
}

/// POST /payments: record a pending payment for an order.
#[tracing::instrument(skip(state, req), fields(order_id = ?req.order_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let order_id = req
        .order_id
        .ok_or_else(|| ApiError::BadRequest("order_id is required".to_string()))?;
    let payment = state
        .services()
        .payments
        .create_payment(order_id, Money::from_cents(req.amount_cents), req.method)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /payments/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.services().payments.get_payment(id).await?))
}

/// POST /payments/:id/complete
#[tracing::instrument(skip(state))]
pub async fn complete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.services().payments.complete_payment(id).await?))
}

/// POST /payments/:id/fail
#[tracing::instrument(skip(state))]
pub async fn fail<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.services().payments.fail_payment(id).await?))
}

/// POST /payments/:id/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.services().payments.cancel_payment(id).await?))
}
