//! Shipment lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ShipmentId};
use domain::Shipment;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateShipmentRequest {
    pub order_id: OrderId,
}

/// POST /shipments: record a pending shipment for a paid order.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<Shipment>), ApiError> {
    let shipment = state
        .services()
        .shipments
        .create_shipment(req.order_id)
        .await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// GET /shipments/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ShipmentId>,
) -> Result<Json<Shipment>, ApiError> {
    Ok(Json(state.services().shipments.get_shipment(id).await?))
}

/// POST /shipments/:id/ship: dispatch and assign a tracking number.
#[tracing::instrument(skip(state))]
pub async fn ship<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ShipmentId>,
) -> Result<Json<Shipment>, ApiError> {
    Ok(Json(state.services().shipments.ship(id).await?))
}

/// POST /shipments/:id/complete
#[tracing::instrument(skip(state))]
pub async fn complete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ShipmentId>,
) -> Result<Json<Shipment>, ApiError> {
    Ok(Json(state.services().shipments.complete_shipment(id).await?))
}

/// POST /shipments/:id/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ShipmentId>,
) -> Result<Json<Shipment>, ApiError> {
    Ok(Json(state.services().shipments.cancel_shipment(id).await?))
}
