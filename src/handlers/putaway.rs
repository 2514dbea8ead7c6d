// src/handlers/putaway.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    services::putaway_service::{DraftScope, PutawayDraft},
};

// ---
// Payload: BuildDraft
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildDraftPayload {
    #[validate(required(message = "O campo 'warehouseId' é obrigatório."))]
    pub warehouse_id: Option<Uuid>,

    /// Restringe o rascunho aos SKUs recebidos de um pedido de compra.
    pub purchase_order_id: Option<Uuid>,
}

// POST /api/putaway/draft
//
// Montar um rascunho é somente-leitura: nada é reservado até o operador
// confirmar via POST /api/tasks. Escopo sem pendências responde um rascunho
// vazio ("nada pendente"), não um erro.
#[utoipa::path(
    post,
    path = "/api/putaway/draft",
    tag = "Putaway",
    request_body = BuildDraftPayload,
    responses(
        (status = 200, description = "Rascunho de putaway montado", body = PutawayDraft),
        (status = 404, description = "Armazém não encontrado")
    )
)]
pub async fn build_draft(
    State(app_state): State<AppState>,
    Json(payload): Json<BuildDraftPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let scope = match payload.purchase_order_id {
        Some(id) => DraftScope::PurchaseOrder(id),
        None => DraftScope::All,
    };

    let draft = app_state
        .putaway_service
        .build_putaway_draft(&app_state.db_pool, payload.warehouse_id.unwrap(), scope)
        .await?;

    Ok(Json(draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};

    // Montar a rota exige que o handler produza um future Send; este teste
    // fixa o contrato em tempo de compilação.
    #[test]
    fn rota_do_rascunho_satisfaz_o_contrato_de_handler() {
        let _app: Router<AppState> = Router::new().route("/draft", post(build_draft));
    }
}
