// src/services/putaway_service.rs

use serde::Serialize;
use sqlx::{Acquire, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::stock::PendingLine,
    services::{
        location_service::{DestinationBatch, ResolvedDestination},
        LocationService, ReservationService,
    },
};

// --- Escopo do rascunho ---
// Todos os SKUs pendentes do armazém, ou só os de um pedido de compra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftScope {
    All,
    PurchaseOrder(Uuid),
}

// --- Motivo de omissão de uma linha ---
// Linhas não-resolvíveis degradam o rascunho graciosamente: saem da lista
// com um código de motivo em vez de derrubar o lote inteiro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NoDestination,
    ReconciliationAnomaly,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    #[schema(example = "SKU-0001")]
    pub sku: String,
    pub reason: SkipReason,
}

// --- Item do rascunho ---
// quantity nasce igual à pendência e é editável pelo operador ANTES da
// confirmação, sempre em [0, pending]; subir acima do teto é rejeitado na
// criação da tarefa, nunca aceito aqui.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub product_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    #[schema(example = 8)]
    pub quantity: i64,
    /// Teto editável: a pendência calculada no momento do rascunho.
    #[schema(example = 8)]
    pub pending_qty: i64,
    pub destination: ResolvedDestination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutawayDraft {
    pub warehouse_id: Uuid,
    pub items: Vec<DraftItem>,
    pub skipped: Vec<SkippedLine>,
}

/// Separa as linhas pendentes entre alocáveis e omitidas (pendência zero sai
/// em silêncio; anomalia sai com motivo, para reconciliação).
pub fn partition_pending(lines: Vec<PendingLine>) -> (Vec<PendingLine>, Vec<SkippedLine>) {
    let mut to_allocate = Vec::new();
    let mut skipped = Vec::new();

    for line in lines {
        if line.anomaly {
            skipped.push(SkippedLine {
                sku: line.sku,
                reason: SkipReason::ReconciliationAnomaly,
            });
        } else if line.pending_qty > 0 {
            to_allocate.push(line);
        }
        // pending == 0 sem anomalia: nada a fazer, não aparece no rascunho
    }

    (to_allocate, skipped)
}

/// Ordena os itens pelo código do destino, para um percurso de guarda
/// eficiente no armazém.
pub fn sort_by_destination(items: &mut [DraftItem]) {
    items.sort_by(|a, b| a.destination.slot().code.cmp(&b.destination.slot().code));
}

// O alocador de putaway. Montar um rascunho é uma LEITURA pura do razão +
// reservas: não tem efeito colateral nenhum, então duas sessões podem
// rascunhar ao mesmo tempo sem risco; só a criação da tarefa serializa.
#[derive(Clone)]
pub struct PutawayService {
    catalog_repo: CatalogRepository,
    reservation_service: ReservationService,
    location_service: LocationService,
}

impl PutawayService {
    pub fn new(
        catalog_repo: CatalogRepository,
        reservation_service: ReservationService,
        location_service: LocationService,
    ) -> Self {
        Self {
            catalog_repo,
            reservation_service,
            location_service,
        }
    }

    /// Monta o rascunho: pendência por SKU, um destino por SKU, itens
    /// ordenados por destino. Escopo sem pendências => rascunho vazio, não
    /// erro (a UI mostra "nada pendente"); pedido de compra sem linhas
    /// recebidas é um no-op, não uma falha.
    pub async fn build_putaway_draft<'e, A>(
        &self,
        conn: A,
        warehouse_id: Uuid,
        scope: DraftScope,
    ) -> Result<PutawayDraft, AppError>
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

        let purchase_order = match scope {
            DraftScope::All => None,
            DraftScope::PurchaseOrder(id) => Some(id),
        };

        let pending = self
            .reservation_service
            .pending_by_sku(&mut *conn, warehouse_id, None, purchase_order)
            .await?;

        let (to_allocate, mut skipped) = partition_pending(pending);

        let mut items = Vec::with_capacity(to_allocate.len());
        let mut batch = DestinationBatch::new();

        for line in to_allocate {
            let product = self
                .catalog_repo
                .get_product_by_sku(&mut *conn, &line.sku)
                .await?
                .ok_or_else(|| AppError::SkuNotFound(line.sku.clone()))?;

            match self
                .location_service
                .resolve_destination(&mut *conn, warehouse_id, &product, &mut batch)
                .await?
            {
                Some(destination) => items.push(DraftItem {
                    product_id: line.product_id,
                    sku: line.sku,
                    quantity: line.pending_qty,
                    pending_qty: line.pending_qty,
                    destination,
                }),
                None => skipped.push(SkippedLine {
                    sku: line.sku,
                    reason: SkipReason::NoDestination,
                }),
            }
        }

        sort_by_destination(&mut items);

        Ok(PutawayDraft {
            warehouse_id,
            items,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::location_service::DestinationSlot;

    fn pending(sku: &str, received: i64, reserved: i64) -> PendingLine {
        let raw = received - reserved;
        PendingLine {
            product_id: Uuid::new_v4(),
            sku: sku.into(),
            received_qty: received,
            reserved_qty: reserved,
            pending_qty: raw.max(0),
            anomaly: raw < 0,
            source_refs: vec![],
        }
    }

    fn item(sku: &str, qty: i64, dest_code: &str) -> DraftItem {
        DraftItem {
            product_id: Uuid::new_v4(),
            sku: sku.into(),
            quantity: qty,
            pending_qty: qty,
            destination: ResolvedDestination::EmptyPool(DestinationSlot {
                location_id: Uuid::new_v4(),
                code: dest_code.into(),
            }),
        }
    }

    #[test]
    fn sku_totalmente_reservado_sai_do_rascunho() {
        // Cenário: 5 recebidos, tarefa aberta reservando 5 => omitido
        let (to_allocate, skipped) = partition_pending(vec![
            pending("X", 8, 0),
            pending("Y", 5, 5),
        ]);
        assert_eq!(to_allocate.len(), 1);
        assert_eq!(to_allocate[0].sku, "X");
        assert_eq!(to_allocate[0].pending_qty, 8);
        assert!(skipped.is_empty());
    }

    #[test]
    fn anomalia_sai_com_motivo() {
        let (to_allocate, skipped) = partition_pending(vec![pending("W", 3, 9)]);
        assert!(to_allocate.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, SkipReason::ReconciliationAnomaly);
    }

    #[test]
    fn escopo_vazio_gera_rascunho_vazio() {
        let (to_allocate, skipped) = partition_pending(vec![]);
        assert!(to_allocate.is_empty());
        assert!(skipped.is_empty());
    }

    #[test]
    fn itens_saem_ordenados_pelo_codigo_do_destino() {
        let mut items = vec![
            item("S3", 1, "C-01"),
            item("S1", 2, "A-01"),
            item("S2", 3, "B-01"),
        ];
        sort_by_destination(&mut items);
        let codes: Vec<&str> = items
            .iter()
            .map(|i| i.destination.slot().code.as_str())
            .collect();
        assert_eq!(codes, vec!["A-01", "B-01", "C-01"]);
    }

    #[test]
    fn particao_e_deterministica() {
        // Rascunhar duas vezes sem criar tarefa no meio => mesmo resultado
        let input = || vec![pending("A", 4, 1), pending("B", 2, 2), pending("C", 6, 0)];
        let (first, _) = partition_pending(input());
        let (second, _) = partition_pending(input());
        let skus1: Vec<_> = first.iter().map(|l| (&l.sku, l.pending_qty)).collect();
        let skus2: Vec<_> = second.iter().map(|l| (&l.sku, l.pending_qty)).collect();
        assert_eq!(skus1, skus2);
    }
}
