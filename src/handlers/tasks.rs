// src/handlers/tasks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::tasks::{Task, TaskDetail, TaskKind},
    services::execution_service::{ExecutionReport, NewTaskItem},
};

// ---
// Payload: CreateTask (a confirmação do operador — é AQUI que se reserva)
// ---
// Serialize é exigido pela validação de comprimento sobre Vec<_> (o valor
// do campo entra nos parâmetros do erro).
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskItemPayload {
    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    #[schema(example = "SKU-0001")]
    pub sku: String,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 8)]
    pub quantity: i64,

    #[validate(length(min = 1, message = "O destino é obrigatório."))]
    #[schema(example = "A-01-03")]
    pub destination: String,

    /// Código do local de origem. Obrigatório para reposição; ignorado no
    /// putaway (a origem é a área de recebimento).
    #[schema(example = "ST-07")]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[validate(required(message = "O campo 'warehouseId' é obrigatório."))]
    pub warehouse_id: Option<Uuid>,

    pub kind: TaskKind,

    #[validate(length(min = 1, message = "A tarefa precisa de ao menos um item."), nested)]
    pub items: Vec<CreateTaskItemPayload>,
}

impl CreateTaskPayload {
    // Validação de consistência entre kind e itens.
    fn validate_consistency(&self) -> Result<(), ValidationError> {
        // Regra: reposição move de um local concreto; todo item precisa da origem.
        if self.kind == TaskKind::Replenishment
            && self.items.iter().any(|i| i.source.is_none())
        {
            return Err(ValidationError::new("SourceRequiredForReplenishment"));
        }
        Ok(())
    }
}

// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = CreateTaskPayload,
    responses(
        (status = 201, description = "Tarefa criada, quantidades reservadas", body = TaskDetail),
        (status = 409, description = "Reserva acima da pendência ou conflito de concorrência")
    )
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("items", e);
        AppError::ValidationError(errors)
    })?;

    let items: Vec<NewTaskItem> = payload
        .items
        .into_iter()
        .map(|i| NewTaskItem {
            sku: i.sku,
            quantity: i.quantity,
            destination_code: i.destination,
            source_code: i.source,
        })
        .collect();

    let detail = app_state
        .execution_service
        .create_task(
            &app_state.db_pool,
            payload.warehouse_id.unwrap(),
            payload.kind,
            items,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub warehouse_id: Uuid,
}

// GET /api/tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Tarefas do armazém", body = [Task])
    )
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state
        .execution_service
        .list_tasks(&app_state.db_pool, query.warehouse_id)
        .await?;

    Ok(Json(tasks))
}

// GET /api/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa com itens", body = TaskDetail),
        (status = 404, description = "Tarefa não encontrada")
    )
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .execution_service
        .get_task_detail(&app_state.db_pool, task_id)
        .await?;

    Ok(Json(detail))
}

// POST /api/tasks/{id}/execute
//
// Aplica os movimentos pareados item a item. Falha de um item não derruba a
// tarefa: o relatório traz o resultado por item e a tarefa fica in_progress
// para nova tentativa.
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/execute",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Relatório de execução por item", body = ExecutionReport),
        (status = 404, description = "Tarefa não encontrada"),
        (status = 409, description = "Tarefa em estado terminal")
    )
)]
pub async fn execute_task(
    State(app_state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .execution_service
        .execute_task(&app_state.db_pool, task_id)
        .await?;

    Ok(Json(report))
}

// POST /api/tasks/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/cancel",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "ID da tarefa")),
    responses(
        (status = 200, description = "Tarefa cancelada, reservas liberadas", body = Task),
        (status = 404, description = "Tarefa não encontrada"),
        (status = 409, description = "Tarefa em estado terminal")
    )
)]
pub async fn cancel_task(
    State(app_state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state
        .execution_service
        .cancel_task(&app_state.db_pool, task_id)
        .await?;

    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, source: Option<&str>) -> CreateTaskItemPayload {
        CreateTaskItemPayload {
            sku: sku.into(),
            quantity: 5,
            destination: "A-01-03".into(),
            source: source.map(Into::into),
        }
    }

    #[test]
    fn tarefa_sem_itens_e_rejeitada_na_validacao() {
        let payload = CreateTaskPayload {
            warehouse_id: Some(Uuid::new_v4()),
            kind: TaskKind::Putaway,
            items: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn putaway_com_itens_passa_sem_origem() {
        let payload = CreateTaskPayload {
            warehouse_id: Some(Uuid::new_v4()),
            kind: TaskKind::Putaway,
            items: vec![item("SKU-0001", None)],
        };
        assert!(payload.validate().is_ok());
        assert!(payload.validate_consistency().is_ok());
    }

    #[test]
    fn reposicao_exige_origem_em_todos_os_itens() {
        let payload = CreateTaskPayload {
            warehouse_id: Some(Uuid::new_v4()),
            kind: TaskKind::Replenishment,
            items: vec![item("SKU-0001", Some("ST-07")), item("SKU-0002", None)],
        };
        assert!(payload.validate().is_ok());
        assert!(payload.validate_consistency().is_err());
    }
}
