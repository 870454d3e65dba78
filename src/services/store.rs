//! services/store.rs
//! Interfaz del almacenamiento durable que consumen todos los servicios.
//! Cada implementación debe acotar el tiempo de sus llamadas; un timeout se
//! reporta como cualquier otro error.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    call_model::{CallClaim, CallCompletion, CallRecord, NewCall},
    notification_model::NotificationRecord,
    tenant_model::{AssistantBinding, TenantConfig, UsageSummary},
};

#[async_trait]
pub trait CallStore: Send + Sync {
    /// Llamadas de `customer_number` con `started_at >= since`.
    async fn count_calls_since(&self, customer_number: &str, since: DateTime<Utc>) -> Result<u64>;

    /// Primera order cuyo `vapi_assistant_id` coincide y que tiene tenant.
    async fn find_assistant_binding(&self, assistant_id: &str)
        -> Result<Option<AssistantBinding>>;

    async fn get_tenant(&self, user_id: &str) -> Result<Option<TenantConfig>>;

    /// Contador a 1 y ventana del mes con el timestamp del propio store, sólo
    /// si la ventana guardada es anterior a `month_start`. `false` si otra
    /// llamada ya abrió el mes.
    async fn reset_monthly_calls(&self, user_id: &str, month_start: DateTime<Utc>)
        -> Result<bool>;

    /// Incremento atómico del contador mensual.
    async fn increment_monthly_calls(&self, user_id: &str) -> Result<()>;

    /// Crea la llamada o fusiona con una existente (nunca sobrescribe tenant/order).
    async fn create_call(&self, call: &NewCall) -> Result<()>;

    /// Upsert a `completed`, fusionando con lo que ya exista.
    async fn complete_call(&self, completion: &CallCompletion) -> Result<()>;

    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>>;

    async fn monthly_usage_since(&self, since: DateTime<Utc>) -> Result<UsageSummary>;

    /// `true` sólo para el primer claim de ese (`call_id`, `claim`).
    async fn claim_call_event(&self, call_id: &str, claim: CallClaim) -> Result<bool>;

    async fn record_notification(&self, record: &NotificationRecord) -> Result<()>;
}
