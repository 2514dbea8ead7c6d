// src/db/task_repo.rs

use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tasks::{Task, TaskItem, TaskItemStatus, TaskKind, TaskStatus},
};

// --- Reserva agregada por SKU ---
#[derive(Debug, Clone, FromRow)]
pub struct ReservedLine {
    pub sku: String,
    pub reserved_qty: i64,
}

// O repositório de tarefas. A consulta de reservas e a trava consultiva
// (advisory lock) que serializa criações concorrentes para o mesmo SKU
// vivem aqui, junto dos dados que elas protegem.
#[derive(Clone)]
pub struct TaskRepository;

impl TaskRepository {
    pub fn new() -> Self {
        Self
    }

    /// Soma TaskItem.quantity por SKU sobre TODAS as tarefas não-canceladas
    /// do tipo dado. Inclui deliberadamente as 'completed': uma tarefa
    /// concluída já consumiu o estoque conceitualmente e precisa continuar
    /// contando contra a pendência até o razão refletir o movimento.
    /// Sempre lida fresca do banco no momento da decisão; nunca cacheada.
    pub async fn reserved_by_sku<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        kind: TaskKind,
    ) -> Result<Vec<ReservedLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, ReservedLine>(
            r#"
            SELECT ti.sku, SUM(ti.quantity)::BIGINT AS reserved_qty
            FROM task_items ti
            JOIN tasks t ON t.id = ti.task_id
            WHERE t.warehouse_id = $1
              AND t.kind = $2
              AND t.status <> 'cancelled'
            GROUP BY ti.sku
            "#,
        )
        .bind(warehouse_id)
        .bind(kind)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Trava consultiva transacional por (armazém, SKU). Serializa o
    /// par "recalcular pendência" + "inserir itens" contra outras criações
    /// para o mesmo SKU; é liberada automaticamente no commit/rollback.
    pub async fn lock_sku<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        sku: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || ':' || $2, 0))")
            .bind(warehouse_id.to_string())
            .bind(sku)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_task<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        kind: TaskKind,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (warehouse_id, kind) VALUES ($1, $2) RETURNING *",
        )
        .bind(warehouse_id)
        .bind(kind)
        .fetch_one(executor)
        .await?;
        Ok(task)
    }

    pub async fn insert_task_item<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
        product_id: Uuid,
        sku: &str,
        quantity: i64,
        source_location_id: Option<Uuid>,
        destination_location_id: Uuid,
    ) -> Result<TaskItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, TaskItem>(
            r#"
            INSERT INTO task_items
                (task_id, product_id, sku, quantity, source_location_id, destination_location_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(product_id)
        .bind(sku)
        .bind(quantity)
        .bind(source_location_id)
        .bind(destination_location_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Violação de constraint na inserção = duas reservas se
            // cruzaram; o chamador refaz a leitura de pendências e tenta
            // de novo.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() || db_err.is_check_violation() {
                    return AppError::ConcurrentConflict;
                }
            }
            e.into()
        })?;
        Ok(item)
    }

    /// Reivindica um item para aplicação dentro da transação do item: marca
    /// 'completed' somente se ainda não estiver. Zero linhas => outra
    /// execução concorrente já aplicou este item; o chamador não movimenta
    /// nada. O rollback da transação desfaz a marca se o par OUT/IN falhar.
    pub async fn claim_item<'e, E>(
        &self,
        executor: E,
        item_id: Uuid,
    ) -> Result<Option<TaskItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, TaskItem>(
            r#"
            UPDATE task_items
            SET status = 'completed', error = NULL
            WHERE id = $1 AND status <> 'completed'
            RETURNING *
            "#,
        )
        .bind(item_id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn get_task<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
    ) -> Result<Option<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(executor)
            .await?;
        Ok(task)
    }

    /// Busca a tarefa travando a linha, para transições de estado seguras
    /// sob execuções/cancelamentos concorrentes.
    pub async fn get_task_for_update<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
    ) -> Result<Option<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(task_id)
            .fetch_optional(executor)
            .await?;
        Ok(task)
    }

    pub async fn list_tasks<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
    ) -> Result<Vec<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE warehouse_id = $1 ORDER BY created_at DESC",
        )
        .bind(warehouse_id)
        .fetch_all(executor)
        .await?;
        Ok(tasks)
    }

    pub async fn list_task_items<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
    ) -> Result<Vec<TaskItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, TaskItem>(
            "SELECT * FROM task_items WHERE task_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(task_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn update_task_status<'e, E>(
        &self,
        executor: E,
        task_id: Uuid,
        status: TaskStatus,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(task_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(task)
    }

    /// Registra o resultado da aplicação de um item (completed, ou failed
    /// com a mensagem do erro para nova tentativa).
    pub async fn update_item_result<'e, E>(
        &self,
        executor: E,
        item_id: Uuid,
        status: TaskItemStatus,
        error: Option<&str>,
    ) -> Result<TaskItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, TaskItem>(
            "UPDATE task_items SET status = $2, error = $3 WHERE id = $1 RETURNING *",
        )
        .bind(item_id)
        .bind(status)
        .bind(error)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }
}
