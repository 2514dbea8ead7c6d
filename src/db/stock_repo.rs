// src/db/stock_repo.rs

use chrono::{Duration, Utc};
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::LocationKind,
        stock::{Movement, MovementDirection, MovementReference, ReceivedLine, StockLine},
    },
};

/// Janela retroativa do scan de recebimentos. Limita o custo da consulta de
/// pendências (movimentos mais antigos já foram absorvidos pelo razão).
pub const RECEIPT_WINDOW_DAYS: i64 = 30;

// --- Linha de estoque com o local resolvido (joins) ---
// Usada pela resolução de destino (consolidação) e pela escolha de origem
// da reposição.
#[derive(Debug, Clone, FromRow)]
pub struct LocatedStock {
    pub location_id: Uuid,
    pub location_code: String,
    pub kind: LocationKind,
    pub available_qty: i64,
}

// --- Frente de separação de um SKU (linha PICKING + política do produto) ---
#[derive(Debug, Clone, FromRow)]
pub struct PickingLine {
    pub product_id: Uuid,
    pub sku: String,
    pub reorder_point: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub location_id: Uuid,
    pub location_code: String,
    pub zone: String,
    pub on_hand_qty: i64,
    pub available_qty: i64,
}

impl PickingLine {
    /// Limiar de reposição do produto: reorder_point tem precedência;
    /// min_stock_level é o fallback. Sem nenhum dos dois, não há política.
    pub fn reorder_threshold(&self) -> Option<i64> {
        self.reorder_point.or(self.min_stock_level)
    }
}

// O repositório do razão de estoque: leituras agregadas, inserção de
// movimentos e as atualizações guardadas de stock_lines. As escritas são
// genéricas sobre Executor para rodarem dentro da transação do serviço.
#[derive(Clone)]
pub struct StockRepository;

impl StockRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Leituras do razão
    // ---
    // Leituras nunca falham por ausência de dados: resultado vazio é estado
    // válido (nada recebido, nada em estoque).

    /// Soma os movimentos IN de RECEIPT por SKU na janela retroativa.
    /// `purchase_order` restringe a um pedido de compra (reference_id).
    pub async fn received_not_put_away<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        sku_filter: Option<&str>,
        purchase_order: Option<Uuid>,
    ) -> Result<Vec<ReceivedLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cutoff = Utc::now() - Duration::days(RECEIPT_WINDOW_DAYS);

        let lines = sqlx::query_as::<_, ReceivedLine>(
            r#"
            SELECT m.product_id,
                   p.sku,
                   SUM(m.quantity)::BIGINT AS received_qty,
                   ARRAY_AGG(DISTINCT m.reference_id) AS source_refs
            FROM movements m
            JOIN products p ON p.id = m.product_id
            WHERE m.warehouse_id = $1
              AND m.direction = 'IN'
              AND m.reference_type = 'RECEIPT'
              AND m.created_at >= $2
              AND ($3::TEXT IS NULL OR p.sku = $3)
              AND ($4::UUID IS NULL OR m.reference_id = $4)
            GROUP BY m.product_id, p.sku
            ORDER BY p.sku ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(cutoff)
        .bind(sku_filter)
        .bind(purchase_order)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Todas as linhas não-zeradas de um produto no armazém.
    pub async fn stock_by_product<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<StockLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, StockLine>(
            r#"
            SELECT * FROM stock_lines
            WHERE warehouse_id = $1 AND product_id = $2
              AND (on_hand_qty > 0 OR reserved_qty > 0)
            ORDER BY available_qty DESC
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Linhas de um produto com o local resolvido, para a cadeia de
    /// resolução de destino e para a escolha de origem da reposição.
    pub async fn located_stock_by_product<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<LocatedStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, LocatedStock>(
            r#"
            SELECT s.location_id,
                   l.code AS location_code,
                   l.kind,
                   s.available_qty
            FROM stock_lines s
            JOIN locations l ON l.id = s.location_id
            WHERE s.warehouse_id = $1 AND s.product_id = $2
            ORDER BY s.available_qty DESC, l.code ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Frentes de separação do armazém (linhas em locais PICKING), com a
    /// política de reposição do produto, para o cálculo de sugestões.
    pub async fn picking_lines<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        zone_filter: Option<&str>,
    ) -> Result<Vec<PickingLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, PickingLine>(
            r#"
            SELECT s.product_id,
                   p.sku,
                   p.reorder_point,
                   p.min_stock_level,
                   s.location_id,
                   l.code AS location_code,
                   l.zone,
                   s.on_hand_qty,
                   s.available_qty
            FROM stock_lines s
            JOIN locations l ON l.id = s.location_id
            JOIN products p ON p.id = s.product_id
            WHERE s.warehouse_id = $1
              AND l.kind = 'PICKING'
              AND ($2::TEXT IS NULL OR l.zone = $2)
            ORDER BY p.sku ASC, l.code ASC
            "#,
        )
        .bind(warehouse_id)
        .bind(zone_filter)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    // ---
    // Escritas (transacionais)
    // ---

    /// Grava uma movimentação no razão (append-only).
    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        direction: MovementDirection,
        quantity: i64,
        reference_type: MovementReference,
        reference_id: Uuid,
    ) -> Result<Movement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            INSERT INTO movements
                (product_id, warehouse_id, location_id, direction, quantity, reference_type, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(location_id)
        .bind(direction)
        .bind(quantity)
        .bind(reference_type)
        .bind(reference_id)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }

    /// Trava (FOR UPDATE) e devolve a linha de estoque de um produto num
    /// local, se existir. Base das aplicações OUT e dos ajustes de reserva.
    pub async fn lock_line<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        location_id: Uuid,
    ) -> Result<Option<StockLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, StockLine>(
            "SELECT * FROM stock_lines WHERE product_id = $1 AND location_id = $2 FOR UPDATE",
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    /// Aplica uma saída: debita on_hand e libera a reserva associada.
    /// Condicional: não aplica se a linha não cobrir a quantidade (0 linhas
    /// afetadas => o chamador aborta a transação do item).
    pub async fn apply_out<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i64,
        release_reserved: i64,
    ) -> Result<Option<StockLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, StockLine>(
            r#"
            UPDATE stock_lines
            SET on_hand_qty = on_hand_qty - $3,
                reserved_qty = GREATEST(reserved_qty - $4, 0),
                updated_at = now()
            WHERE product_id = $1 AND location_id = $2
              AND on_hand_qty >= $3
              AND on_hand_qty - $3 >= GREATEST(reserved_qty - $4, 0)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(quantity)
        .bind(release_reserved)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    /// Aplica uma entrada: UPSERT atômico no saldo do destino.
    /// ON CONFLICT soma à quantidade existente, prevenindo updates perdidos
    /// quando duas tarefas miram o mesmo destino.
    pub async fn apply_in<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        quantity: i64,
    ) -> Result<StockLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, StockLine>(
            r#"
            INSERT INTO stock_lines (product_id, warehouse_id, location_id, on_hand_qty)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET
                on_hand_qty = stock_lines.on_hand_qty + $4,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(location_id)
        .bind(quantity)
        .fetch_one(executor)
        .await?;
        Ok(line)
    }

    /// Ajusta a reserva de uma linha (delta positivo reserva, negativo
    /// libera). Condicional: nunca deixa a reserva negativa nem acima do
    /// on_hand. 0 linhas afetadas => reserva impossível.
    pub async fn adjust_reserved<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        location_id: Uuid,
        delta: i64,
    ) -> Result<Option<StockLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, StockLine>(
            r#"
            UPDATE stock_lines
            SET reserved_qty = reserved_qty + $3,
                updated_at = now()
            WHERE product_id = $1 AND location_id = $2
              AND reserved_qty + $3 >= 0
              AND reserved_qty + $3 <= on_hand_qty
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }
}
