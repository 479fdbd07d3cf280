//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ItemId, OrderId};
use domain::{Order, Payment, Shipment};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// POST /orders: reserve stock and create a pending order.
#[tracing::instrument(skip(state, req), fields(item_id = %req.item_id, quantity = req.quantity))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .services()
        .orders
        .create_order(req.item_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services().orders.get_order(id).await?))
}

/// POST /orders/:id/pay
#[tracing::instrument(skip(state))]
pub async fn pay<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services().orders.pay_for_order(id).await?))
}

/// POST /orders/:id/ship
#[tracing::instrument(skip(state))]
pub async fn ship<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services().orders.ship_order(id).await?))
}

/// POST /orders/:id/cancel: cancel a pending order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.services().orders.cancel_order(id).await?))
}

/// GET /orders/:id/payments
#[tracing::instrument(skip(state))]
pub async fn payments<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    Ok(Json(state.services().payments.payments_for_order(id).await?))
}

/// GET /orders/:id/shipments
#[tracing::instrument(skip(state))]
pub async fn shipments<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<Shipment>>, ApiError> {
    Ok(Json(state.services().shipments.shipments_for_order(id).await?))
}
