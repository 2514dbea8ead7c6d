// src/handlers/stock.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::stock::{PendingLine, StockLine},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub warehouse_id: Uuid,
    /// Restringe a um único SKU.
    pub sku: Option<String>,
}

// GET /api/stock/pending
//
// A pendência publicada aqui é o único número de "quanto ainda pode ser
// alocado"; linhas com anomalia de reconciliação vêm com pending 0 e
// anomaly=true.
#[utoipa::path(
    get,
    path = "/api/stock/pending",
    tag = "Stock",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pendência de putaway por SKU", body = [PendingLine])
    )
)]
pub async fn get_pending(
    State(app_state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = app_state.db_pool.acquire().await?;
    let pending = app_state
        .reservation_service
        .pending_by_sku(
            &mut conn,
            query.warehouse_id,
            query.sku.as_deref(),
            None,
        )
        .await?;

    Ok(Json(pending))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct StockBySkuQuery {
    pub warehouse_id: Uuid,
}

// GET /api/stock/{sku}
#[utoipa::path(
    get,
    path = "/api/stock/{sku}",
    tag = "Stock",
    params(
        ("sku" = String, Path, description = "SKU do produto"),
        StockBySkuQuery
    ),
    responses(
        (status = 200, description = "Linhas de estoque do SKU", body = [StockLine]),
        (status = 404, description = "SKU não encontrado")
    )
)]
pub async fn get_stock_by_sku(
    State(app_state): State<AppState>,
    Path(sku): Path<String>,
    Query(query): Query<StockBySkuQuery>,
) -> Result<impl IntoResponse, AppError> {
    let lines = app_state
        .reservation_service
        .stock_by_sku(&app_state.db_pool, query.warehouse_id, &sku)
        .await?;

    Ok(Json(lines))
}
