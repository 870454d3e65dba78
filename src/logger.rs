//! logger.rs
//! Logger de la app sobre env_logger.

use log::LevelFilter;

pub fn init_logger() {
    // RUST_LOG define el nivel; si no está, "info".
    let log_env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_env))
        // sqlx registra cada query en info
        .filter_module("sqlx::query", LevelFilter::Warn)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}
