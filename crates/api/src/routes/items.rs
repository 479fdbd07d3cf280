//! Catalog seeding endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ItemId, Money};
use domain::StockItem;
use serde::Deserialize;
use store::{Store, StoreExt};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub stock_quantity: u32,
    pub price_cents: i64,
    pub description: Option<String>,
}

/// POST /items: seed a stock record.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<StockItem>), ApiError> {
    let item = StockItem::new(
        req.name,
        req.stock_quantity,
        Money::from_cents(req.price_cents),
        req.description,
    )?;
    state.store.insert_stock_item(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /items/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ItemId>,
) -> Result<Json<StockItem>, ApiError> {
    Ok(Json(state.services().inventory.get_item(id).await?))
}
