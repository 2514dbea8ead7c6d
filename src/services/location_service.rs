// src/services/location_service.rs

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgConnection;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{stock_repo::LocatedStock, CatalogRepository, StockRepository},
    models::catalog::{Location, LocationKind, Product},
};

// --- Destino escolhido ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSlot {
    pub location_id: Uuid,
    #[schema(example = "A-01-03")]
    pub code: String,
}

// A cadeia de resolução como contrato de primeira classe, não como ordem
// implícita de chamadas: consolidar > local padrão do catálogo > pool de
// locais vazios. A variante diz QUAL regra venceu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "rule", content = "slot", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedDestination {
    Consolidate(DestinationSlot),
    DefaultLocation(DestinationSlot),
    EmptyPool(DestinationSlot),
}

impl ResolvedDestination {
    pub fn slot(&self) -> &DestinationSlot {
        match self {
            ResolvedDestination::Consolidate(s)
            | ResolvedDestination::DefaultLocation(s)
            | ResolvedDestination::EmptyPool(s) => s,
        }
    }
}

/// Controle de um lote de resolução: um slot do pool de vazios entregue a um
/// item do lote não pode ser entregue a outro item do MESMO lote (dois SKUs
/// colidiriam no mesmo local vazio).
#[derive(Debug, Default)]
pub struct DestinationBatch {
    taken: HashSet<Uuid>,
}

impl DestinationBatch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Regra 1 — consolidação: linha existente do SKU em local PICKING/STORAGE
/// com disponibilidade. Desempate: maior available_qty (maximiza a
/// consolidação); em empate exato, o menor código.
pub fn pick_consolidation(lines: &[LocatedStock]) -> Option<DestinationSlot> {
    lines
        .iter()
        .filter(|l| {
            matches!(l.kind, LocationKind::Picking | LocationKind::Storage) && l.available_qty > 0
        })
        .max_by(|a, b| {
            a.available_qty
                .cmp(&b.available_qty)
                .then_with(|| b.location_code.cmp(&a.location_code))
        })
        .map(|l| DestinationSlot {
            location_id: l.location_id,
            code: l.location_code.clone(),
        })
}

/// Regra 3 — pool de vazios: o próximo código livre em ordem ascendente,
/// pulando os já entregues neste lote.
pub fn pick_empty(pool: &[Location], batch: &DestinationBatch) -> Option<DestinationSlot> {
    let mut candidates: Vec<&Location> = pool.iter().filter(|l| !batch.taken.contains(&l.id)).collect();
    candidates.sort_by(|a, b| a.code.cmp(&b.code));
    candidates.first().map(|l| DestinationSlot {
        location_id: l.id,
        code: l.code.clone(),
    })
}

/// A cadeia completa, pura, sobre dados já buscados. Primeira regra que
/// casar vence. `None` => o chamador omite a linha com motivo NoDestination.
pub fn choose_destination(
    stock: &[LocatedStock],
    default_location: Option<&Location>,
    empty_pool: &[Location],
    batch: &mut DestinationBatch,
) -> Option<ResolvedDestination> {
    if let Some(slot) = pick_consolidation(stock) {
        return Some(ResolvedDestination::Consolidate(slot));
    }

    if let Some(location) = default_location {
        return Some(ResolvedDestination::DefaultLocation(DestinationSlot {
            location_id: location.id,
            code: location.code.clone(),
        }));
    }

    if let Some(slot) = pick_empty(empty_pool, batch) {
        batch.taken.insert(slot.location_id);
        return Some(ResolvedDestination::EmptyPool(slot));
    }

    None
}

// O resolvedor de locais: busca os insumos e delega a decisão à cadeia pura.
#[derive(Clone)]
pub struct LocationService {
    catalog_repo: CatalogRepository,
    stock_repo: StockRepository,
}

impl LocationService {
    pub fn new(catalog_repo: CatalogRepository, stock_repo: StockRepository) -> Self {
        Self {
            catalog_repo,
            stock_repo,
        }
    }

    /// Opera sobre uma conexão já adquirida; é chamado SKU a SKU dentro da
    /// montagem de um rascunho.
    pub async fn resolve_destination(
        &self,
        conn: &mut PgConnection,
        warehouse_id: Uuid,
        product: &Product,
        batch: &mut DestinationBatch,
    ) -> Result<Option<ResolvedDestination>, AppError> {
        let stock = self
            .stock_repo
            .located_stock_by_product(&mut *conn, warehouse_id, product.id)
            .await?;

        // O local padrão do catálogo só vale se pertencer ao armazém em questão.
        let default_location = match product.default_location_id {
            Some(id) => self
                .catalog_repo
                .get_location(&mut *conn, id)
                .await?
                .filter(|l| l.warehouse_id == warehouse_id),
            None => None,
        };

        let empty_pool = self
            .catalog_repo
            .get_empty_locations(&mut *conn, warehouse_id)
            .await?;

        Ok(choose_destination(
            &stock,
            default_location.as_ref(),
            &empty_pool,
            batch,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn located(code: &str, kind: LocationKind, available: i64) -> LocatedStock {
        LocatedStock {
            location_id: Uuid::new_v4(),
            location_code: code.into(),
            kind,
            available_qty: available,
        }
    }

    fn location(code: &str, kind: LocationKind) -> Location {
        Location {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            code: code.into(),
            zone: "A".into(),
            kind,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn consolidacao_escolhe_o_maior_saldo_disponivel() {
        let lines = vec![
            located("B-02", LocationKind::Storage, 10),
            located("A-01", LocationKind::Picking, 30),
            located("C-03", LocationKind::Storage, 20),
        ];
        assert_eq!(pick_consolidation(&lines).unwrap().code, "A-01");
    }

    #[test]
    fn consolidacao_ignora_locais_de_entrada_e_sem_saldo() {
        let lines = vec![
            located("REC-01", LocationKind::Receiving, 99),
            located("STG-01", LocationKind::Staging, 50),
            located("A-01", LocationKind::Picking, 0),
        ];
        assert!(pick_consolidation(&lines).is_none());
    }

    #[test]
    fn empate_de_saldo_prefere_o_menor_codigo() {
        let lines = vec![
            located("B-02", LocationKind::Storage, 10),
            located("A-01", LocationKind::Storage, 10),
        ];
        assert_eq!(pick_consolidation(&lines).unwrap().code, "A-01");
    }

    #[test]
    fn cadeia_prefere_consolidar_sobre_local_padrao() {
        let stock = vec![located("B-05", LocationKind::Storage, 4)];
        let default = location("D-01", LocationKind::Storage);
        let mut batch = DestinationBatch::new();

        let resolved = choose_destination(&stock, Some(&default), &[], &mut batch).unwrap();
        assert!(matches!(resolved, ResolvedDestination::Consolidate(_)));
        assert_eq!(resolved.slot().code, "B-05");
    }

    #[test]
    fn sem_estoque_cai_para_o_local_padrao() {
        let default = location("D-01", LocationKind::Storage);
        let pool = vec![location("Z-09", LocationKind::Storage)];
        let mut batch = DestinationBatch::new();

        let resolved = choose_destination(&[], Some(&default), &pool, &mut batch).unwrap();
        assert!(matches!(resolved, ResolvedDestination::DefaultLocation(_)));
        assert_eq!(resolved.slot().code, "D-01");
    }

    #[test]
    fn pool_de_vazios_entrega_o_primeiro_codigo_em_ordem() {
        // Cenário: sem estoque, sem local padrão, 3 vazios => primeiro
        // código em ordem alfabética.
        let pool = vec![
            location("C-01", LocationKind::Storage),
            location("A-01", LocationKind::Storage),
            location("B-01", LocationKind::Storage),
        ];
        let mut batch = DestinationBatch::new();

        let resolved = choose_destination(&[], None, &pool, &mut batch).unwrap();
        assert!(matches!(resolved, ResolvedDestination::EmptyPool(_)));
        assert_eq!(resolved.slot().code, "A-01");
    }

    #[test]
    fn pool_nao_reusa_slot_dentro_do_mesmo_lote() {
        let pool = vec![
            location("A-01", LocationKind::Storage),
            location("B-01", LocationKind::Storage),
        ];
        let mut batch = DestinationBatch::new();

        let first = choose_destination(&[], None, &pool, &mut batch).unwrap();
        let second = choose_destination(&[], None, &pool, &mut batch).unwrap();
        let third = choose_destination(&[], None, &pool, &mut batch);

        assert_eq!(first.slot().code, "A-01");
        assert_eq!(second.slot().code, "B-01");
        // Pool esgotado dentro do lote => sem destino
        assert!(third.is_none());
    }
}
