//! models/tenant_model.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agente asignado a una zona (clave normalizada, p.ej. "porta-romana").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
}

/// Configuración de un tenant (colección `users`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub user_id: String,
    pub zone_assignments: HashMap<String, ZoneAssignment>,
    pub monthly_calls: i64,
    pub monthly_calls_limit: i64,
    pub current_month_start: Option<DateTime<Utc>>,
    pub subscription_plan: Option<String>,
}

/// assistant de la plataforma -> (tenant, order)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantBinding {
    pub assistant_id: String,
    pub user_id: String,
    pub order_id: String,
}

/// Totales del mes para el monitor de costos.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSummary {
    pub calls: u64,
    pub total_duration_secs: i64,
}
