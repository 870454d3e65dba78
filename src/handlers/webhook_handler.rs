//! handlers/webhook_handler.rs
//! Endpoint que recibe los eventos de la plataforma de voz.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{
    errors::WebhookError,
    models::webhook_model::WebhookEnvelope,
    services::{
        signature_service::{SignatureVerifier, SIGNATURE_HEADER},
        webhook_service::WebhookService,
    },
};

/// POST /api/webhooks/vapi
///
/// La firma se verifica sobre los bytes crudos, antes de parsear el JSON.
pub async fn vapi_webhook_endpoint(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<SignatureVerifier>,
    webhook_service: web::Data<WebhookService>,
) -> Result<HttpResponse, WebhookError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if !verifier.verify(&body, signature) {
        log::warn!("Firma inválida en webhook: posible ataque");
        return Err(WebhookError::Unauthorized);
    }

    let event: WebhookEnvelope = serde_json::from_slice(&body).map_err(|e| {
        log::error!("Error procesando webhook: {}", e);
        e
    })?;

    let response = webhook_service.handle_event(event).await;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/health
pub async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
