use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::{
    cost_service::CostService, function_service::FunctionRegistry,
    notification_service::NotificationService, quota_service::QuotaService,
    rate_limit_service::RateLimitService, signature_service::SignatureVerifier,
    sqlite_store::SqliteStore, store::CallStore, tenant_service::TenantService,
    twilio_service::TwilioNotifier, webhook_service::WebhookService, zone_service::ZoneRouter,
};

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    // Crear carpeta de la base si es un archivo local (p.ej. "sqlite:data/calls.db")
    if let Some(path) = config.database_url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !path.starts_with(":memory:") {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("No se pudo crear el directorio {:?}", parent))?;
            }
        }
    }

    log::info!("Conectando a SQLite en {}", config.database_url);
    let store = SqliteStore::connect(&config.database_url, config.database_timeout).await?;
    store.run_migrations().await?;
    Ok(store)
}

fn build_webhook_service(
    config: &AppConfig,
    store: Arc<dyn CallStore>,
) -> anyhow::Result<WebhookService> {
    let notifier = TwilioNotifier::new(config.twilio.clone())?;
    if !notifier.is_configured() {
        log::warn!("Twilio no configurado: las notificaciones fallarán");
    }
    if config.default_recipient.is_none() {
        log::warn!("TWILIO_DESTINATION_WHATSAPP no definido: sólo se notificarán zonas asignadas");
    }

    Ok(WebhookService::new(
        store.clone(),
        RateLimitService::new(store.clone(), config.max_calls_per_hour, config.max_calls_per_day),
        TenantService::new(store.clone(), config.assistant_cache_ttl),
        ZoneRouter::new(store.clone()),
        QuotaService::new(store.clone()),
        CostService::new(
            store.clone(),
            config.cost_per_minute_eur,
            config.cost_alert_threshold_eur,
        ),
        NotificationService::new(store, Arc::new(notifier), config.default_recipient.clone()),
        FunctionRegistry::with_defaults(),
        config.first_message.clone(),
        config.rate_limit_message.clone(),
    ))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();

    let verifier = SignatureVerifier::new(config.webhook_secret.clone());
    if !verifier.is_configured() {
        log::error!("VAPI_WEBHOOK_SECRET no configurado: se rechazarán todos los webhooks");
    }

    let store = setup_database(&config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;
    let store: Arc<dyn CallStore> = Arc::new(store);

    let webhook_service = build_webhook_service(&config, store)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;

    // Levantar servidor
    log::info!("Levantando servidor en {}:{}", config.host, config.port);
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(webhook_service.clone()))
            .configure(app::init_app)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    server.bind((config.host.as_str(), config.port))?.run().await
}
