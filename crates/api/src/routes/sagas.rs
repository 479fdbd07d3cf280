//! Saga trigger and operator compensation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{ItemId, Money, PaymentId};
use saga::OrderSagaOutcome;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RunSagaRequest {
    pub item_id: ItemId,
    pub quantity: u32,
    pub amount_cents: i64,
    pub method: String,
}

/// POST /sagas/orders: run the order saga end to end.
#[tracing::instrument(skip(state, req), fields(item_id = %req.item_id, quantity = req.quantity))]
pub async fn run<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RunSagaRequest>,
) -> Result<(StatusCode, Json<OrderSagaOutcome>), ApiError> {
    let outcome = state
        .saga
        .run_order_saga(
            req.item_id,
            req.quantity,
            Money::from_cents(req.amount_cents),
            req.method,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Deserialize)]
pub struct CompensateRequest {
    pub item_id: ItemId,
    pub quantity: u32,
    pub payment_id: Option<PaymentId>,
}

/// POST /compensations: cancel a payment and restore stock by hand.
#[tracing::instrument(skip(state, req), fields(item_id = %req.item_id, quantity = req.quantity))]
pub async fn compensate<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CompensateRequest>,
) -> Result<StatusCode, ApiError> {
    let services = state.services();
    let payment = match req.payment_id {
        Some(id) => Some(services.payments.get_payment(id).await?),
        None => None,
    };
    services
        .compensation
        .compensate(req.item_id, req.quantity, payment.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
