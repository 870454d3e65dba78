//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod cost_service;
pub mod function_service;
pub mod notification_service;
pub mod quota_service;
pub mod rate_limit_service;
pub mod signature_service;
pub mod sqlite_store;
pub mod store;
pub mod tenant_service;
pub mod twilio_service;
pub mod webhook_service;
pub mod zone_service;

