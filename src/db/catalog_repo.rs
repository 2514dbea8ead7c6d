// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Location, Product, Warehouse},
};

// O repositório de catálogo. O motor de alocação só LÊ o catálogo
// (produtos, armazéns, locais); o CRUD completo é do colaborador externo.
#[derive(Clone)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_warehouse<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
    ) -> Result<Option<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .fetch_optional(executor)
            .await?;
        Ok(warehouse)
    }

    pub async fn get_product_by_sku<'e, E>(
        &self,
        executor: E,
        sku: &str,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = $1")
            .bind(sku)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn get_location<'e, E>(
        &self,
        executor: E,
        location_id: Uuid,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(location_id)
            .fetch_optional(executor)
            .await?;
        Ok(location)
    }

    pub async fn get_location_by_code<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        code: &str,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE warehouse_id = $1 AND code = $2",
        )
        .bind(warehouse_id)
        .bind(code)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }

    /// Área de entrada do armazém: a origem implícita do OUT de um putaway.
    /// Preferimos RECEIVING; STAGING é o fallback. Desempate por código.
    pub async fn get_staging_location<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE warehouse_id = $1 AND kind IN ('RECEIVING', 'STAGING')
            ORDER BY (kind = 'RECEIVING') DESC, code ASC
            LIMIT 1
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }

    /// Pool de locais vazios: locais de guarda (PICKING/STORAGE) sem nenhuma
    /// disponibilidade agregada entre todos os SKUs, em ordem de código.
    pub async fn get_empty_locations<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
    ) -> Result<Vec<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT l.*
            FROM locations l
            LEFT JOIN stock_lines s ON s.location_id = l.id
            WHERE l.warehouse_id = $1 AND l.kind IN ('PICKING', 'STORAGE')
            GROUP BY l.id
            HAVING COALESCE(SUM(s.available_qty), 0) = 0
            ORDER BY l.code ASC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(executor)
        .await?;
        Ok(locations)
    }
}
