//src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Leituras do razão (pendência e estoque por SKU)
    let stock_routes = Router::new()
        .route("/pending", get(handlers::stock::get_pending))
        .route("/{sku}", get(handlers::stock::get_stock_by_sku));

    // Rascunho de putaway (somente-leitura; a reserva acontece em /tasks)
    let putaway_routes = Router::new()
        .route("/draft", post(handlers::putaway::build_draft));

    let replenishment_routes = Router::new()
        .route("/suggestions", get(handlers::replenishment::get_suggestions));

    // Tarefas: confirmar (reserva) -> executar (movimentos) -> concluir
    let task_routes = Router::new()
        .route("/"
               ,post(handlers::tasks::create_task)
               .get(handlers::tasks::list_tasks)
        )
        .route("/{id}", get(handlers::tasks::get_task))
        .route("/{id}/execute", post(handlers::tasks::execute_task))
        .route("/{id}/cancel", post(handlers::tasks::cancel_task));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/stock", stock_routes)
        .nest("/api/putaway", putaway_routes)
        .nest("/api/replenishment", replenishment_routes)
        .nest("/api/tasks", task_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
