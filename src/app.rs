//! app.rs
use crate::handlers::webhook_handler;
use actix_web::web;

/// Los transcripts largos superan el límite por defecto de 256 KB
const MAX_WEBHOOK_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_WEBHOOK_BODY_BYTES))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(webhook_handler::health_endpoint))
                .service(
                    web::scope("/webhooks").route(
                        "/vapi",
                        web::post().to(webhook_handler::vapi_webhook_endpoint),
                    ),
                ),
        );
}
