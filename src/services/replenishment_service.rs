// src/services/replenishment_service.rs

use serde::Serialize;
use sqlx::{Acquire, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        stock_repo::{LocatedStock, PickingLine},
        CatalogRepository, StockRepository,
    },
    models::catalog::LocationKind,
};

// --- Sugestão de reposição ---
// Computação somente-leitura, refeita do estado vivo do razão a cada
// chamada; não existe cache de sugestões persistido (o estoque muda o
// tempo todo).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub product_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    pub picking_location_id: Uuid,
    #[schema(example = "PK-01")]
    pub picking_code: String,
    #[schema(example = "A")]
    pub zone: String,
    #[schema(example = 2)]
    pub picking_on_hand: i64,
    #[schema(example = 10)]
    pub threshold: i64,
    #[schema(example = 8)]
    pub shortfall: i64,
    pub source_location_id: Uuid,
    #[schema(example = "ST-07")]
    pub source_code: String,
    #[schema(example = 50)]
    pub source_available: i64,
    /// min(shortfall, disponível na origem)
    #[schema(example = 8)]
    pub suggested_qty: i64,
}

/// Melhor origem: entre as linhas do SKU fora de PICKING, a de maior
/// disponibilidade. Empate => menor código. Nenhuma com saldo => None.
pub fn pick_source(sources: &[LocatedStock], picking_location_id: Uuid) -> Option<&LocatedStock> {
    sources
        .iter()
        .filter(|l| {
            l.location_id != picking_location_id
                && !matches!(l.kind, LocationKind::Picking)
                && l.available_qty > 0
        })
        .max_by(|a, b| {
            a.available_qty
                .cmp(&b.available_qty)
                .then_with(|| b.location_code.cmp(&a.location_code))
        })
}

/// A conta da sugestão para uma frente de separação:
/// threshold = reorder_point (precedência) ou min_stock_level;
/// shortfall = max(0, threshold - disponível da frente);
/// suggested = min(shortfall, disponível na melhor origem).
/// Sem política, sem falta ou sem origem com saldo => nenhuma sugestão.
/// A falta conta o DISPONÍVEL da frente (físico menos reservado): o que já
/// está reservado para sair não sustenta a frente.
pub fn build_suggestion(line: &PickingLine, sources: &[LocatedStock]) -> Option<Suggestion> {
    let threshold = line.reorder_threshold()?;
    let shortfall = (threshold - line.available_qty).max(0);
    if shortfall == 0 {
        return None;
    }

    let source = pick_source(sources, line.location_id)?;

    Some(Suggestion {
        product_id: line.product_id,
        sku: line.sku.clone(),
        picking_location_id: line.location_id,
        picking_code: line.location_code.clone(),
        zone: line.zone.clone(),
        picking_on_hand: line.on_hand_qty,
        threshold,
        shortfall,
        source_location_id: source.location_id,
        source_code: source.location_code.clone(),
        source_available: source.available_qty,
        suggested_qty: shortfall.min(source.available_qty),
    })
}

// O sugeridor de reposição: frente de separação abaixo do limiar => propor
// transferência da melhor reserva.
#[derive(Clone)]
pub struct ReplenishmentService {
    catalog_repo: CatalogRepository,
    stock_repo: StockRepository,
}

impl ReplenishmentService {
    pub fn new(catalog_repo: CatalogRepository, stock_repo: StockRepository) -> Self {
        Self {
            catalog_repo,
            stock_repo,
        }
    }

    pub async fn suggest<'e, A>(
        &self,
        conn: A,
        warehouse_id: Uuid,
        zone_filter: Option<&str>,
    ) -> Result<Vec<Suggestion>, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = conn.acquire().await?;

        if self
            .catalog_repo
            .get_warehouse(&mut *conn, warehouse_id)
            .await?
            .is_none()
        {
            return Err(AppError::WarehouseNotFound);
        }

        let picking = self
            .stock_repo
            .picking_lines(&mut *conn, warehouse_id, zone_filter)
            .await?;

        let mut suggestions = Vec::new();
        for line in &picking {
            let sources = self
                .stock_repo
                .located_stock_by_product(&mut *conn, warehouse_id, line.product_id)
                .await?;
            if let Some(suggestion) = build_suggestion(line, &sources) {
                suggestions.push(suggestion);
            }
        }

        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picking(sku: &str, on_hand: i64, reorder: Option<i64>, min_level: Option<i64>) -> PickingLine {
        PickingLine {
            product_id: Uuid::new_v4(),
            sku: sku.into(),
            reorder_point: reorder,
            min_stock_level: min_level,
            location_id: Uuid::new_v4(),
            location_code: "PK-01".into(),
            zone: "A".into(),
            on_hand_qty: on_hand,
            available_qty: on_hand,
        }
    }

    fn source(code: &str, kind: LocationKind, available: i64) -> LocatedStock {
        LocatedStock {
            location_id: Uuid::new_v4(),
            location_code: code.into(),
            kind,
            available_qty: available,
        }
    }

    #[test]
    fn falta_limitada_pela_falta_nao_pela_origem() {
        // Cenário: frente com 2, reorder_point 10, reserva com 50 =>
        // shortfall 8, sugestão 8 (capada pela falta, não pelos 50)
        let line = picking("Z", 2, Some(10), None);
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];

        let s = build_suggestion(&line, &sources).unwrap();
        assert_eq!(s.shortfall, 8);
        assert_eq!(s.suggested_qty, 8);
        assert_eq!(s.source_code, "ST-01");
    }

    #[test]
    fn sem_origem_com_saldo_nao_ha_sugestao() {
        // Cenário: frente com 2, reorder_point 10, nenhum outro local com
        // estoque => nada a propor
        let line = picking("W", 2, Some(10), None);
        assert!(build_suggestion(&line, &[]).is_none());
        assert!(build_suggestion(&line, &[source("ST-01", LocationKind::Storage, 0)]).is_none());
    }

    #[test]
    fn origem_pequena_capa_a_sugestao() {
        let line = picking("Z", 2, Some(10), None);
        let sources = vec![source("ST-01", LocationKind::Storage, 3)];
        assert_eq!(build_suggestion(&line, &sources).unwrap().suggested_qty, 3);
    }

    #[test]
    fn reorder_point_tem_precedencia_sobre_min_stock() {
        let line = picking("Z", 2, Some(10), Some(4));
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];
        assert_eq!(build_suggestion(&line, &sources).unwrap().threshold, 10);
    }

    #[test]
    fn min_stock_vale_quando_nao_ha_reorder_point() {
        let line = picking("Z", 2, None, Some(4));
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];
        let s = build_suggestion(&line, &sources).unwrap();
        assert_eq!(s.threshold, 4);
        assert_eq!(s.suggested_qty, 2);
    }

    #[test]
    fn falta_conta_o_disponivel_nao_o_fisico() {
        // Frente com 9 físicos mas 3 reservados (6 disponíveis), limiar 10
        // => falta 4, não 1
        let mut line = picking("Z", 9, Some(10), None);
        line.available_qty = 6;
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];

        let s = build_suggestion(&line, &sources).unwrap();
        assert_eq!(s.shortfall, 4);
        assert_eq!(s.suggested_qty, 4);
    }

    #[test]
    fn frente_acima_do_limiar_nao_gera_sugestao() {
        let line = picking("Z", 12, Some(10), None);
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];
        assert!(build_suggestion(&line, &sources).is_none());
    }

    #[test]
    fn sem_politica_nao_ha_sugestao() {
        let line = picking("Z", 0, None, None);
        let sources = vec![source("ST-01", LocationKind::Storage, 50)];
        assert!(build_suggestion(&line, &sources).is_none());
    }

    #[test]
    fn melhor_origem_e_a_de_maior_disponibilidade_fora_do_picking() {
        let line = picking("Z", 2, Some(10), None);
        let sources = vec![
            source("PK-02", LocationKind::Picking, 99),
            source("ST-01", LocationKind::Storage, 20),
            source("ST-02", LocationKind::Storage, 40),
        ];
        let s = build_suggestion(&line, &sources).unwrap();
        assert_eq!(s.source_code, "ST-02");
        assert_eq!(s.source_available, 40);
    }
}
