//! errors.rs
//! Errores que llegan a la respuesta HTTP del webhook.
//! Las decisiones de negocio (rate limit, sin zona, campos faltantes) no son
//! errores: se responden con 200 y un payload descriptivo.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Firma ausente o inválida
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid JSON body: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
