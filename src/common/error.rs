// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// A taxonomia do motor: NotFound / OverAllocation / ConcurrentConflict /
// InvalidTransition / InsufficientStock. "NoSource"/"NoDestination" NÃO são
// erros: a linha afetada é omitida do rascunho/sugestão com um código de
// motivo (ver services).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Armazém não encontrado")]
    WarehouseNotFound,

    #[error("SKU '{0}' não encontrado")]
    SkuNotFound(String),

    #[error("Local '{0}' não encontrado")]
    LocationNotFound(String),

    #[error("Tarefa não encontrada")]
    TaskNotFound,

    // Pedido de reserva acima da pendência calculada. Nunca fazemos clamp
    // silencioso no servidor: o chamador recalcula a pendência e reenvia
    // com quantidade menor.
    #[error("Reserva de {requested} unidades excede a pendência de {pending} para o SKU '{sku}'")]
    OverAllocation {
        sku: String,
        requested: i64,
        pending: i64,
    },

    // Duas reservas concorrentes se cruzaram; o chamador deve rebuscar as
    // pendências e tentar de novo.
    #[error("Conflito de concorrência, recarregue as pendências e tente novamente")]
    ConcurrentConflict,

    #[error("Transição de estado inválida: {0}")]
    InvalidTransition(String),

    // Falha por item na execução (estoque insuficiente na origem, etc.).
    // Fica registrada no item; a tarefa permanece in_progress.
    #[error("Estoque insuficiente no local de origem para o SKU '{sku}' (necessário {required}, disponível {available})")]
    InsufficientStock {
        sku: String,
        required: i64,
        available: i64,
    },

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::WarehouseNotFound
            | AppError::SkuNotFound(_)
            | AppError::LocationNotFound(_)
            | AppError::TaskNotFound => (StatusCode::NOT_FOUND, self.to_string()),

            AppError::OverAllocation { .. } | AppError::InvalidTransition(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }

            // 409 + retryable: o cliente deve recalcular e reenviar.
            AppError::ConcurrentConflict => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "retryable": true,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            AppError::InsufficientStock { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }

            // Todos os outros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
