//! services/quota_service.rs
//! Contador mensual de llamadas por tenant, con reset al cambiar de mes.
//! Sólo reporta el exceso; la facturación queda fuera de este servicio.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::services::store::CallStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub monthly_calls: i64,
    pub monthly_limit: i64,
    /// Llamadas por encima del límite, sólo con límite > 0
    pub overage: Option<i64>,
    pub month_reset: bool,
}

/// Primer instante (UTC) del mes que contiene `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn CallStore>,
}

impl QuotaService {
    pub fn new(store: Arc<dyn CallStore>) -> Self {
        QuotaService { store }
    }

    pub async fn record_call(&self, user_id: &str) -> Option<QuotaStatus> {
        self.record_call_at(user_id, Utc::now()).await
    }

    /// Ante un error del store se devuelve `None`.
    pub async fn record_call_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<QuotaStatus> {
        match self.try_record_call(user_id, now).await {
            Ok(status) => status,
            Err(e) => {
                log::error!("Error actualizando contador mensual de {}: {:?}", user_id, e);
                None
            }
        }
    }

    async fn try_record_call(&self, user_id: &str, now: DateTime<Utc>) -> Result<Option<QuotaStatus>> {
        let Some(tenant) = self.store.get_tenant(user_id).await? else {
            log::warn!("Tenant {} no encontrado para actualizar el contador", user_id);
            return Ok(None);
        };

        let current_month = month_start(now);
        // Sin ventana registrada se considera el mes actual
        let window_start = tenant.current_month_start.unwrap_or(current_month);

        // La ventana leída puede estar vieja: el store decide si el reset aplica
        let month_reset = window_start < current_month
            && self.store.reset_monthly_calls(user_id, current_month).await?;
        if month_reset {
            log::info!("Nuevo mes para {}, contador reseteado", user_id);
        } else {
            self.store.increment_monthly_calls(user_id).await?;
        }

        // Releer después del update para ver incrementos concurrentes
        let Some(updated) = self.store.get_tenant(user_id).await? else {
            return Ok(None);
        };

        let overage = if updated.monthly_calls_limit > 0
            && updated.monthly_calls > updated.monthly_calls_limit
        {
            let overage_calls = updated.monthly_calls - updated.monthly_calls_limit;
            log::warn!(
                "User {} superó su límite: {}/{} (+{} llamadas de overage, plan {:?})",
                user_id,
                updated.monthly_calls,
                updated.monthly_calls_limit,
                overage_calls,
                updated.subscription_plan
            );
            Some(overage_calls)
        } else {
            None
        };

        Ok(Some(QuotaStatus {
            monthly_calls: updated.monthly_calls,
            monthly_limit: updated.monthly_calls_limit,
            overage,
            month_reset,
        }))
    }
}
