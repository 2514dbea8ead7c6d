// src/services/reservation_service.rs

use std::collections::HashMap;

use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{task_repo::ReservedLine, CatalogRepository, StockRepository, TaskRepository},
    models::{
        stock::{PendingLine, ReceivedLine, StockLine},
        tasks::TaskKind,
    },
};

/// Pendência publicada a partir da subtração bruta.
/// Nunca publicamos valor negativo: o clamp vai a zero e a linha é marcada
/// como anomalia de reconciliação (duas reservas se cruzaram em algum
/// momento e o total reservado passou do recebido).
pub fn compute_pending(received: i64, reserved: i64) -> (i64, bool) {
    let raw = received - reserved;
    ((raw.max(0)), raw < 0)
}

/// Combina as linhas recebidas com as reservas agregadas por SKU.
pub fn assemble_pending(received: Vec<ReceivedLine>, reserved: &[ReservedLine]) -> Vec<PendingLine> {
    let reserved_map: HashMap<&str, i64> = reserved
        .iter()
        .map(|r| (r.sku.as_str(), r.reserved_qty))
        .collect();

    received
        .into_iter()
        .map(|line| {
            let reserved_qty = reserved_map.get(line.sku.as_str()).copied().unwrap_or(0);
            let (pending_qty, anomaly) = compute_pending(line.received_qty, reserved_qty);
            if anomaly {
                tracing::warn!(
                    sku = %line.sku,
                    received = line.received_qty,
                    reserved = reserved_qty,
                    "reserva agregada excede o recebido; pendência publicada como 0"
                );
            }
            PendingLine {
                product_id: line.product_id,
                sku: line.sku,
                received_qty: line.received_qty,
                reserved_qty,
                pending_qty,
                anomaly,
                source_refs: line.source_refs,
            }
        })
        .collect()
}

// A contabilidade de reservas. A pendência calculada aqui é o ÚNICO número
// autoritativo de "quanto ainda pode ser alocado"; o available_qty do razão
// não serve para isso, porque só reflete movimentos já aplicados, não
// reservas em voo.
#[derive(Clone)]
pub struct ReservationService {
    catalog_repo: CatalogRepository,
    stock_repo: StockRepository,
    task_repo: TaskRepository,
}

impl ReservationService {
    pub fn new(
        catalog_repo: CatalogRepository,
        stock_repo: StockRepository,
        task_repo: TaskRepository,
    ) -> Self {
        Self {
            catalog_repo,
            stock_repo,
            task_repo,
        }
    }

    /// Pendência por SKU: recebido (janela de 30 dias) menos reservado por
    /// tarefas de putaway não-canceladas. Sempre recalculada fresca a partir
    /// do banco; cachear este número entre requisições é a fonte clássica de
    /// dupla alocação.
    ///
    /// Opera sobre uma conexão já adquirida: o chamador decide se ela vem do
    /// pool ou de uma leitura maior em andamento (o rascunho de putaway).
    pub async fn pending_by_sku(
        &self,
        conn: &mut PgConnection,
        warehouse_id: Uuid,
        sku_filter: Option<&str>,
        purchase_order: Option<Uuid>,
    ) -> Result<Vec<PendingLine>, AppError> {
        let received = self
            .stock_repo
            .received_not_put_away(&mut *conn, warehouse_id, sku_filter, purchase_order)
            .await?;
        let reserved = self
            .task_repo
            .reserved_by_sku(&mut *conn, warehouse_id, TaskKind::Putaway)
            .await?;

        Ok(assemble_pending(received, &reserved))
    }

    /// Leitura do razão: todas as linhas não-zeradas de um SKU no armazém
    /// (consulta de consolidação / visão de estoque da UI).
    pub async fn stock_by_sku<'e, A>(
        &self,
        conn: A,
        warehouse_id: Uuid,
        sku: &str,
    ) -> Result<Vec<StockLine>, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = conn.acquire().await?;

        let product = self
            .catalog_repo
            .get_product_by_sku(&mut *conn, sku)
            .await?
            .ok_or_else(|| AppError::SkuNotFound(sku.to_string()))?;

        self.stock_repo
            .stock_by_product(&mut *conn, warehouse_id, product.id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received(sku: &str, qty: i64) -> ReceivedLine {
        ReceivedLine {
            product_id: Uuid::new_v4(),
            sku: sku.into(),
            received_qty: qty,
            source_refs: vec![Uuid::new_v4()],
        }
    }

    fn reserved(sku: &str, qty: i64) -> ReservedLine {
        ReservedLine {
            sku: sku.into(),
            reserved_qty: qty,
        }
    }

    #[test]
    fn pendencia_e_recebido_menos_reservado() {
        assert_eq!(compute_pending(8, 0), (8, false));
        assert_eq!(compute_pending(10, 4), (6, false));
    }

    #[test]
    fn pendencia_nunca_publica_negativo() {
        // Anomalia: reservado passou do recebido. Publica 0 e sinaliza.
        assert_eq!(compute_pending(5, 7), (0, true));
        assert_eq!(compute_pending(0, 0), (0, false));
    }

    #[test]
    fn tarefa_aberta_zera_a_pendencia_do_sku() {
        // 5 recebidos, tarefa in_progress reservando 5 => pendência 0
        let lines = assemble_pending(vec![received("Y", 5)], &[reserved("Y", 5)]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pending_qty, 0);
        assert!(!lines[0].anomaly);
    }

    #[test]
    fn sku_sem_reserva_mantem_o_recebido_inteiro() {
        let lines = assemble_pending(vec![received("X", 8)], &[reserved("OUTRO", 3)]);
        assert_eq!(lines[0].pending_qty, 8);
        assert_eq!(lines[0].reserved_qty, 0);
    }

    #[test]
    fn anomalia_marca_a_linha() {
        let lines = assemble_pending(vec![received("Z", 3)], &[reserved("Z", 9)]);
        assert_eq!(lines[0].pending_qty, 0);
        assert!(lines[0].anomaly);
    }
}
