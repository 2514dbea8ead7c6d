// src/handlers/replenishment.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, services::replenishment_service::Suggestion};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub warehouse_id: Uuid,
    /// Restringe às frentes de separação de uma zona.
    pub zone: Option<String>,
}

// GET /api/replenishment/suggestions
//
// Recomputada do razão vivo a cada chamada; não existe cache de sugestões.
#[utoipa::path(
    get,
    path = "/api/replenishment/suggestions",
    tag = "Replenishment",
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Sugestões de reposição", body = [Suggestion]),
        (status = 404, description = "Armazém não encontrado")
    )
)]
pub async fn get_suggestions(
    State(app_state): State<AppState>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let suggestions = app_state
        .replenishment_service
        .suggest(
            &app_state.db_pool,
            query.warehouse_id,
            query.zone.as_deref(),
        )
        .await?;

    Ok(Json(suggestions))
}
