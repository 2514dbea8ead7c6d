// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Armazém ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: Uuid,
    #[schema(example = "CD-01")]
    pub code: String,
    #[schema(example = "Centro de Distribuição Principal")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// --- Tipo de Local ---
// RECEIVING/STAGING são áreas de entrada; PICKING é a frente de separação;
// STORAGE é a reserva.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "location_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Receiving,
    Picking,
    Storage,
    Staging,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    #[schema(example = "A-01-03")]
    pub code: String,
    #[schema(example = "A")]
    pub zone: String,
    pub kind: LocationKind,
    pub created_at: DateTime<Utc>,
}

// --- Produto (catálogo) ---
// O motor só lê estes campos: SKU, local padrão e a política de reposição.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    #[schema(example = "Caixa de Parafusos 40mm")]
    pub name: String,
    pub default_location_id: Option<Uuid>,
    // reorder_point tem precedência sobre min_stock_level quando ambos existem
    #[schema(example = 10)]
    pub reorder_point: Option<i64>,
    #[schema(example = 5)]
    pub min_stock_level: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

