// src/models/stock.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Saldo por (produto, local) ---
// Criado/atualizado apenas pela aplicação de movimentos e pela contabilidade
// de reservas. Invariante (garantida pelo banco): available = on_hand - reserved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    #[schema(example = 50)]
    pub on_hand_qty: i64,
    #[schema(example = 10)]
    pub reserved_qty: i64,
    #[schema(example = 40)]
    pub available_qty: i64,
    pub updated_at: DateTime<Utc>,
}

// --- Direção do movimento ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_direction", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_reference", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReference {
    Receipt,
    Putaway,
    Replenishment,
    Transfer,
}

// --- Movimentação (razão imutável) ---
// Um par OUT/IN da mesma transferência lógica compartilha o reference_id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub direction: MovementDirection,
    #[schema(example = 8)]
    pub quantity: i64,
    pub reference_type: MovementReference,
    pub reference_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Saldo líquido de um conjunto de movimentos (IN positivo, OUT negativo).
/// Para qualquer reference_id de transferência interna o resultado é zero:
/// todo OUT tem um IN de mesma quantidade.
pub fn net_quantity(movements: &[Movement]) -> i64 {
    movements
        .iter()
        .map(|m| match m.direction {
            MovementDirection::In => m.quantity,
            MovementDirection::Out => -m.quantity,
        })
        .sum()
}

// --- Linha agregada "recebido e ainda não guardado" ---
// Resultado do scan de movimentos RECEIPT na janela de 30 dias, por SKU.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedLine {
    pub product_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    #[schema(example = 8)]
    pub received_qty: i64,
    /// IDs de referência (pedidos de compra) que originaram os recebimentos.
    pub source_refs: Vec<Uuid>,
}

// --- Linha de pendência publicada ---
// pending = max(0, received - reserved). Quando a subtração bruta seria
// negativa, o valor publicado fica em zero e a linha é marcada como anomalia
// de reconciliação.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingLine {
    pub product_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    #[schema(example = 8)]
    pub received_qty: i64,
    #[schema(example = 0)]
    pub reserved_qty: i64,
    #[schema(example = 8)]
    pub pending_qty: i64,
    #[schema(example = false)]
    pub anomaly: bool,
    pub source_refs: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(direction: MovementDirection, quantity: i64, reference_id: Uuid) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            direction,
            quantity,
            reference_type: MovementReference::Putaway,
            reference_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn par_out_in_fecha_em_zero() {
        // Transferência interna: o OUT da origem e o IN do destino
        // compartilham o reference_id e se anulam.
        let reference = Uuid::new_v4();
        let pair = vec![
            movement(MovementDirection::Out, 8, reference),
            movement(MovementDirection::In, 8, reference),
        ];
        assert_eq!(net_quantity(&pair), 0);
    }

    #[test]
    fn recebimento_sozinho_soma_positivo() {
        let reference = Uuid::new_v4();
        let receipts = vec![
            movement(MovementDirection::In, 5, reference),
            movement(MovementDirection::In, 3, reference),
        ];
        assert_eq!(net_quantity(&receipts), 8);
    }
}
