// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{CatalogRepository, StockRepository, TaskRepository},
    services::{
        ExecutionService, LocationService, PutawayService, ReplenishmentService,
        ReservationService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    // O grafo de serviços do motor, montado uma vez na inicialização
    pub reservation_service: ReservationService,
    pub putaway_service: PutawayService,
    pub replenishment_service: ReplenishmentService,
    pub execution_service: ExecutionService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o grafo de dependências ---
        let catalog_repo = CatalogRepository::new();
        let stock_repo = StockRepository::new();
        let task_repo = TaskRepository::new();

        let reservation_service = ReservationService::new(
            catalog_repo.clone(),
            stock_repo.clone(),
            task_repo.clone(),
        );
        let location_service = LocationService::new(catalog_repo.clone(), stock_repo.clone());
        let putaway_service = PutawayService::new(
            catalog_repo.clone(),
            reservation_service.clone(),
            location_service,
        );
        let replenishment_service =
            ReplenishmentService::new(catalog_repo.clone(), stock_repo.clone());
        let execution_service = ExecutionService::new(catalog_repo, stock_repo, task_repo);

        Ok(Self {
            db_pool,
            reservation_service,
            putaway_service,
            replenishment_service,
            execution_service,
        })
    }
}
