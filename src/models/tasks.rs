// src/models/tasks.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Putaway,
    Replenishment,
}

// Máquina de estados:
//   pending -> in_progress -> completed
//   pending | in_progress -> cancelled
// 'completed' e 'cancelled' são terminais. Só 'cancelled' libera a reserva;
// uma tarefa 'completed' continua contando contra a pendência até o razão
// refletir o movimento (decisão deliberada, ver DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskItemStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    #[schema(example = 8)]
    pub quantity: i64,
    // NULL em itens de putaway: a origem é a área de recebimento do armazém,
    // resolvida no momento da execução.
    pub source_location_id: Option<Uuid>,
    pub destination_location_id: Uuid,
    pub status: TaskItemStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Tarefa com itens (resposta da API) ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub header: Task,
    pub items: Vec<TaskItem>,
}

/// Estado agregado de uma tarefa a partir dos estados dos seus itens.
/// Todos os itens aplicados => completed; qualquer item pendente ou com
/// falha mantém a tarefa in_progress para nova tentativa item a item.
pub fn rollup_status(items: &[TaskItemStatus]) -> TaskStatus {
    if !items.is_empty()
        && items.iter().all(|s| matches!(s, TaskItemStatus::Completed))
    {
        TaskStatus::Completed
    } else {
        TaskStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tarefa_so_completa_com_todos_os_itens_aplicados() {
        use TaskItemStatus::*;

        assert_eq!(rollup_status(&[Completed, Completed]), TaskStatus::Completed);
        // Cenário: item 1 aplicado, item 2 falhou => tarefa segue in_progress
        assert_eq!(rollup_status(&[Completed, Failed]), TaskStatus::InProgress);
        assert_eq!(rollup_status(&[Completed, Pending]), TaskStatus::InProgress);
    }
}
