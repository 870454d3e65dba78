//! services/cost_service.rs
//! Estimación del costo del mes en curso y alerta por umbral.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::services::{quota_service::month_start, store::CallStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostReport {
    pub calls: u64,
    pub total_duration_secs: i64,
    pub estimated_cost_eur: f64,
    pub over_threshold: bool,
}

#[derive(Clone)]
pub struct CostService {
    store: Arc<dyn CallStore>,
    cost_per_minute_eur: f64,
    alert_threshold_eur: f64,
}

impl CostService {
    pub fn new(store: Arc<dyn CallStore>, cost_per_minute_eur: f64, alert_threshold_eur: f64) -> Self {
        CostService {
            store,
            cost_per_minute_eur,
            alert_threshold_eur,
        }
    }

    pub async fn check_monthly_costs(&self) -> Option<CostReport> {
        self.check_monthly_costs_at(Utc::now()).await
    }

    /// Errores del store: se loguean y no hay reporte.
    pub async fn check_monthly_costs_at(&self, now: DateTime<Utc>) -> Option<CostReport> {
        let usage = match self.store.monthly_usage_since(month_start(now)).await {
            Ok(usage) => usage,
            Err(e) => {
                log::error!("Error calculando costos del mes: {:?}", e);
                return None;
            }
        };

        let estimated_cost_eur =
            (usage.total_duration_secs.max(0) as f64 / 60.0) * self.cost_per_minute_eur;

        log::info!(
            "Estadísticas del mes: {} llamadas, {}s en total, ~€{:.2}",
            usage.calls,
            usage.total_duration_secs,
            estimated_cost_eur
        );

        let over_threshold = estimated_cost_eur > self.alert_threshold_eur;
        if over_threshold {
            log::warn!(
                "ALERTA DE COSTOS: el mes va en €{:.2} (umbral: €{:.2})",
                estimated_cost_eur,
                self.alert_threshold_eur
            );
        }

        Some(CostReport {
            calls: usage.calls,
            total_duration_secs: usage.total_duration_secs,
            estimated_cost_eur,
            over_threshold,
        })
    }
}
