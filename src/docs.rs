// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Stock ---
        handlers::stock::get_pending,
        handlers::stock::get_stock_by_sku,

        // --- Putaway ---
        handlers::putaway::build_draft,

        // --- Replenishment ---
        handlers::replenishment::get_suggestions,

        // --- Tasks ---
        handlers::tasks::create_task,
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::execute_task,
        handlers::tasks::cancel_task,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::Warehouse,
            models::catalog::Location,
            models::catalog::LocationKind,
            models::catalog::Product,

            // --- Razão ---
            models::stock::StockLine,
            models::stock::Movement,
            models::stock::MovementDirection,
            models::stock::MovementReference,
            models::stock::ReceivedLine,
            models::stock::PendingLine,

            // --- Tarefas ---
            models::tasks::TaskKind,
            models::tasks::TaskStatus,
            models::tasks::TaskItemStatus,
            models::tasks::Task,
            models::tasks::TaskItem,
            models::tasks::TaskDetail,

            // --- Motor ---
            services::location_service::DestinationSlot,
            services::location_service::ResolvedDestination,
            services::putaway_service::SkipReason,
            services::putaway_service::SkippedLine,
            services::putaway_service::DraftItem,
            services::putaway_service::PutawayDraft,
            services::replenishment_service::Suggestion,
            services::execution_service::ItemResult,
            services::execution_service::ExecutionReport,

            // --- Payloads ---
            handlers::putaway::BuildDraftPayload,
            handlers::tasks::CreateTaskItemPayload,
            handlers::tasks::CreateTaskPayload,
        )
    ),
    tags(
        (name = "Stock", description = "Leituras do razão de estoque"),
        (name = "Putaway", description = "Rascunhos de guarda de recebidos"),
        (name = "Replenishment", description = "Sugestões de reposição da frente de separação"),
        (name = "Tasks", description = "Criação, execução e cancelamento de tarefas")
    ),
    info(
        title = "WMS Backend — Motor de Reserva e Alocação",
        description = "Pendência de putaway, resolução de destinos, sugestões de reposição e execução de movimentos pareados."
    )
)]
pub struct ApiDoc;
