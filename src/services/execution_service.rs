// src/services/execution_service.rs

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, StockRepository, TaskRepository},
    models::{
        catalog::Location,
        stock::{MovementDirection, MovementReference},
        tasks::{rollup_status, Task, TaskDetail, TaskItem, TaskItemStatus, TaskKind, TaskStatus},
    },
    services::reservation_service::assemble_pending,
};

// --- Item aprovado pelo operador (entrada da criação de tarefa) ---
#[derive(Debug, Clone)]
pub struct NewTaskItem {
    pub sku: String,
    pub quantity: i64,
    pub destination_code: String,
    /// Obrigatório para reposição; ignorado no putaway (a origem é a área
    /// de recebimento, resolvida na execução).
    pub source_code: Option<String>,
}

// --- Resultado por item de uma execução ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    pub status: TaskItemStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub task: Task,
    pub items: Vec<ItemResult>,
}

impl MovementReference {
    fn for_task(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Putaway => MovementReference::Putaway,
            TaskKind::Replenishment => MovementReference::Replenishment,
        }
    }
}

// --- Desfecho da aplicação de um item ---
// AlreadyApplied: outra execução concorrente (duplo clique, retry após
// timeout) venceu a corrida por este item; nada foi movimentado de novo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyOutcome {
    Applied,
    AlreadyApplied,
    TaskCancelled,
}

/// Um item só é aplicável enquanto não estiver 'completed'. Item concluído
/// nunca gera um segundo par de movimentos, nem numa reexecução da tarefa.
pub fn needs_apply(status: TaskItemStatus) -> bool {
    status != TaskItemStatus::Completed
}

/// Quanto de reserva a aplicação de um item libera na linha de origem.
/// A reposição reservou na criação (reserved_qty da origem); o putaway
/// reserva só no armazenamento de tarefas, nada a liberar no razão.
pub fn reservation_release(kind: TaskKind, quantity: i64) -> i64 {
    match kind {
        TaskKind::Putaway => 0,
        TaskKind::Replenishment => quantity,
    }
}

// O executor de alocação: o ÚNICO componente que muta o razão. Cria tarefas
// (reserva) e, na execução, transforma cada item num par OUT/IN atômico.
#[derive(Clone)]
pub struct ExecutionService {
    catalog_repo: CatalogRepository,
    stock_repo: StockRepository,
    task_repo: TaskRepository,
}

impl ExecutionService {
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

    // ---
    // Criação (reserva)
    // ---

    /// Cria a tarefa aprovada, reservando as quantidades. A checagem
    /// "a pendência ainda cobre o pedido?" e a inserção são atômicas em
    /// relação a outras criações do mesmo SKU: travamos um advisory lock
    /// por (armazém, SKU) — em ordem, para não haver deadlock entre
    /// criações multi-SKU — e recalculamos a pendência já sob a trava.
    pub async fn create_task<'e, A>(
        &self,
        conn: A,
        warehouse_id: Uuid,
        kind: TaskKind,
        items: Vec<NewTaskItem>,
    ) -> Result<TaskDetail, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut tx = conn.begin().await?;

        if self
            .catalog_repo
            .get_warehouse(&mut *tx, warehouse_id)
            .await?
            .is_none()
        {
            return Err(AppError::WarehouseNotFound);
        }

        // Total pedido por SKU (itens repetidos somam), em ordem de SKU.
        let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
        for item in &items {
            *requested.entry(item.sku.as_str()).or_insert(0) += item.quantity;
        }

        for sku in requested.keys() {
            self.task_repo.lock_sku(&mut *tx, warehouse_id, sku).await?;
        }

        // Putaway: sob a trava, a pendência é recalculada fresca e o pedido
        // acima do teto é rejeitado — nunca clampado em silêncio.
        if kind == TaskKind::Putaway {
            let received = self
                .stock_repo
                .received_not_put_away(&mut *tx, warehouse_id, None, None)
                .await?;
            let reserved = self
                .task_repo
                .reserved_by_sku(&mut *tx, warehouse_id, TaskKind::Putaway)
                .await?;
            let pending = assemble_pending(received, &reserved);

            for (sku, qty) in &requested {
                let ceiling = pending
                    .iter()
                    .find(|l| l.sku == *sku)
                    .map(|l| l.pending_qty)
                    .unwrap_or(0);
                if *qty > ceiling {
                    return Err(AppError::OverAllocation {
                        sku: (*sku).to_string(),
                        requested: *qty,
                        pending: ceiling,
                    });
                }
            }
        }

        let task = self.task_repo.insert_task(&mut *tx, warehouse_id, kind).await?;

        let mut created = Vec::with_capacity(items.len());
        for item in &items {
            let product = self
                .catalog_repo
                .get_product_by_sku(&mut *tx, &item.sku)
                .await?
                .ok_or_else(|| AppError::SkuNotFound(item.sku.clone()))?;

            let destination = self
                .catalog_repo
                .get_location_by_code(&mut *tx, warehouse_id, &item.destination_code)
                .await?
                .ok_or_else(|| AppError::LocationNotFound(item.destination_code.clone()))?;

            // Reposição: reserva na linha de origem, com trava de linha.
            let source_location_id = match kind {
                TaskKind::Putaway => None,
                TaskKind::Replenishment => {
                    let code = item
                        .source_code
                        .as_deref()
                        .ok_or_else(|| AppError::LocationNotFound(String::from("origem")))?;
                    let source = self
                        .catalog_repo
                        .get_location_by_code(&mut *tx, warehouse_id, code)
                        .await?
                        .ok_or_else(|| AppError::LocationNotFound(code.to_string()))?;

                    let reserved = self
                        .stock_repo
                        .adjust_reserved(&mut *tx, product.id, source.id, item.quantity)
                        .await?;
                    if reserved.is_none() {
                        let available = self
                            .stock_repo
                            .lock_line(&mut *tx, product.id, source.id)
                            .await?
                            .map(|l| l.available_qty)
                            .unwrap_or(0);
                        return Err(AppError::InsufficientStock {
                            sku: item.sku.clone(),
                            required: item.quantity,
                            available,
                        });
                    }
                    Some(source.id)
                }
            };

            let created_item = self
                .task_repo
                .insert_task_item(
                    &mut *tx,
                    task.id,
                    product.id,
                    &item.sku,
                    item.quantity,
                    source_location_id,
                    destination.id,
                )
                .await?;
            created.push(created_item);
        }

        tx.commit().await?;

        tracing::info!(
            task_id = %task.id,
            kind = ?kind,
            items = created.len(),
            "tarefa criada e quantidades reservadas"
        );

        Ok(TaskDetail {
            header: task,
            items: created,
        })
    }

    // ---
    // Execução (movimentos pareados)
    // ---

    /// Executa a tarefa item a item. Cada item é uma transação própria: o
    /// par OUT/IN ou aplica inteiro ou não aplica nada — aplicação parcial
    /// nunca é observável. Um item que falha vira 'failed' com o erro
    /// registrado e NÃO derruba a tarefa: ela fica in_progress para nova
    /// tentativa só dos itens que faltam.
    pub async fn execute_task(
        &self,
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<ExecutionReport, AppError> {
        // Transição pending -> in_progress sob trava de linha.
        let task = {
            let mut tx = pool.begin().await?;
            let task = self
                .task_repo
                .get_task_for_update(&mut *tx, task_id)
                .await?
                .ok_or(AppError::TaskNotFound)?;

            let task = match task.status {
                TaskStatus::Pending => {
                    self.task_repo
                        .update_task_status(&mut *tx, task_id, TaskStatus::InProgress)
                        .await?
                }
                TaskStatus::InProgress => task,
                other => {
                    return Err(AppError::InvalidTransition(format!(
                        "não é possível executar uma tarefa {other:?}"
                    )))
                }
            };
            tx.commit().await?;
            task
        };

        let items = self.task_repo.list_task_items(pool, task_id).await?;

        // Origem implícita do putaway: a área de recebimento do armazém.
        let staging = match task.kind {
            TaskKind::Putaway => {
                self.catalog_repo
                    .get_staging_location(pool, task.warehouse_id)
                    .await?
            }
            TaskKind::Replenishment => None,
        };

        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            if !needs_apply(item.status) {
                results.push(ItemResult {
                    item_id: item.id,
                    sku: item.sku.clone(),
                    status: TaskItemStatus::Completed,
                    error: None,
                });
                continue;
            }

            match self.apply_item(pool, &task, item, staging.as_ref()).await {
                Ok(ApplyOutcome::Applied) | Ok(ApplyOutcome::AlreadyApplied) => {
                    results.push(ItemResult {
                        item_id: item.id,
                        sku: item.sku.clone(),
                        status: TaskItemStatus::Completed,
                        error: None,
                    })
                }
                Ok(ApplyOutcome::TaskCancelled) => {
                    return Err(AppError::InvalidTransition(String::from(
                        "a tarefa foi cancelada durante a execução",
                    )));
                }
                Err(err) => {
                    // Rollback já aconteceu (transação descartada); registra
                    // a falha no item para o operador tentar de novo.
                    let message = err.to_string();
                    tracing::warn!(
                        task_id = %task.id,
                        item_id = %item.id,
                        sku = %item.sku,
                        error = %message,
                        "falha ao aplicar item; tarefa permanece in_progress"
                    );
                    self.task_repo
                        .update_item_result(pool, item.id, TaskItemStatus::Failed, Some(&message))
                        .await?;
                    results.push(ItemResult {
                        item_id: item.id,
                        sku: item.sku.clone(),
                        status: TaskItemStatus::Failed,
                        error: Some(message),
                    });
                }
            }
        }

        // Roll-up: completed só com TODOS os itens aplicados.
        let statuses: Vec<TaskItemStatus> = results.iter().map(|r| r.status).collect();
        let rolled = rollup_status(&statuses);
        let task = if rolled != task.status {
            self.task_repo.update_task_status(pool, task_id, rolled).await?
        } else {
            task
        };

        Ok(ExecutionReport { task, items: results })
    }

    /// Aplica um item: OUT na origem + IN no destino, compartilhando um
    /// reference_id novo, mais a atualização dos dois saldos — tudo numa
    /// transação. Qualquer falha descarta a transação inteira.
    ///
    /// A transação começa travando a linha da tarefa e reivindicando o item
    /// com um UPDATE condicional: o par OUT/IN só acontece uma vez por item,
    /// mesmo com duas execuções concorrentes ou um cancelamento no meio. A
    /// lista de itens lida antes do laço é só um snapshot; a verdade é a
    /// reivindicação sob trava.
    async fn apply_item(
        &self,
        pool: &PgPool,
        task: &Task,
        item: &TaskItem,
        staging: Option<&Location>,
    ) -> Result<ApplyOutcome, AppError> {
        let mut tx = pool.begin().await?;

        let current = self
            .task_repo
            .get_task_for_update(&mut *tx, task.id)
            .await?
            .ok_or(AppError::TaskNotFound)?;
        if current.status == TaskStatus::Cancelled {
            return Ok(ApplyOutcome::TaskCancelled);
        }

        if self.task_repo.claim_item(&mut *tx, item.id).await?.is_none() {
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let source_location_id = match item.source_location_id {
            Some(id) => id,
            None => {
                staging
                    .ok_or_else(|| {
                        AppError::LocationNotFound(String::from("área de recebimento"))
                    })?
                    .id
            }
        };

        let release = reservation_release(task.kind, item.quantity);
        let applied = self
            .stock_repo
            .apply_out(
                &mut *tx,
                item.product_id,
                source_location_id,
                item.quantity,
                release,
            )
            .await?;
        if applied.is_none() {
            let available = self
                .stock_repo
                .lock_line(&mut *tx, item.product_id, source_location_id)
                .await?
                .map(|l| l.on_hand_qty)
                .unwrap_or(0);
            return Err(AppError::InsufficientStock {
                sku: item.sku.clone(),
                required: item.quantity,
                available,
            });
        }

        let reference_type = MovementReference::for_task(task.kind);
        let reference_id = Uuid::new_v4();

        self.stock_repo
            .insert_movement(
                &mut *tx,
                item.product_id,
                task.warehouse_id,
                source_location_id,
                MovementDirection::Out,
                item.quantity,
                reference_type,
                reference_id,
            )
            .await?;
        self.stock_repo
            .insert_movement(
                &mut *tx,
                item.product_id,
                task.warehouse_id,
                item.destination_location_id,
                MovementDirection::In,
                item.quantity,
                reference_type,
                reference_id,
            )
            .await?;

        self.stock_repo
            .apply_in(
                &mut *tx,
                item.product_id,
                task.warehouse_id,
                item.destination_location_id,
                item.quantity,
            )
            .await?;

        tx.commit().await?;
        Ok(ApplyOutcome::Applied)
    }

    // ---
    // Cancelamento e consultas
    // ---

    /// Cancela a tarefa, liberando a reserva imediatamente. Só pending e
    /// in_progress cancelam; completed/cancelled são terminais.
    pub async fn cancel_task<'e, A>(&self, conn: A, task_id: Uuid) -> Result<Task, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut tx = conn.begin().await?;

        let task = self
            .task_repo
            .get_task_for_update(&mut *tx, task_id)
            .await?
            .ok_or(AppError::TaskNotFound)?;

        if task.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "não é possível cancelar uma tarefa {:?}",
                task.status
            )));
        }

        // Reposição: devolve a reserva da origem dos itens ainda não
        // aplicados (os aplicados já a consumiram no OUT).
        if task.kind == TaskKind::Replenishment {
            let items = self.task_repo.list_task_items(&mut *tx, task_id).await?;
            for item in items {
                if item.status == TaskItemStatus::Completed {
                    continue;
                }
                if let Some(source_id) = item.source_location_id {
                    let released = self
                        .stock_repo
                        .adjust_reserved(&mut *tx, item.product_id, source_id, -item.quantity)
                        .await?;
                    if released.is_none() {
                        tracing::warn!(
                            task_id = %task_id,
                            item_id = %item.id,
                            "reserva da origem não pôde ser devolvida integralmente"
                        );
                    }
                }
            }
        }

        let task = self
            .task_repo
            .update_task_status(&mut *tx, task_id, TaskStatus::Cancelled)
            .await?;

        tx.commit().await?;

        tracing::info!(task_id = %task_id, "tarefa cancelada; reservas liberadas");
        Ok(task)
    }

    pub async fn get_task_detail<'e, A>(
        &self,
        conn: A,
        task_id: Uuid,
    ) -> Result<TaskDetail, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = conn.acquire().await?;

        let task = self
            .task_repo
            .get_task(&mut *conn, task_id)
            .await?
            .ok_or(AppError::TaskNotFound)?;
        let items = self.task_repo.list_task_items(&mut *conn, task_id).await?;

        Ok(TaskDetail {
            header: task,
            items,
        })
    }

    pub async fn list_tasks<'e, A>(
        &self,
        conn: A,
        warehouse_id: Uuid,
    ) -> Result<Vec<Task>, AppError>
    where
        A: Acquire<'e, Database = Postgres> + Send,
    {
        let mut conn = conn.acquire().await?;
        self.task_repo.list_tasks(&mut *conn, warehouse_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn putaway_nao_libera_reserva_do_razao() {
        // A reserva do putaway vive no armazenamento de tarefas, não na linha
        assert_eq!(reservation_release(TaskKind::Putaway, 8), 0);
    }

    #[test]
    fn reposicao_libera_exatamente_a_quantidade_do_item() {
        assert_eq!(reservation_release(TaskKind::Replenishment, 8), 8);
    }

    #[test]
    fn item_concluido_nao_e_reaplicado() {
        // Reexecução da tarefa (duplo clique, retry): itens concluídos saem
        // direto no relatório, sem um segundo par de movimentos.
        assert!(!needs_apply(TaskItemStatus::Completed));
        assert!(needs_apply(TaskItemStatus::Pending));
        assert!(needs_apply(TaskItemStatus::Failed));
    }
}
