//! tests/support.rs
//! Dobles de prueba compartidos: store en memoria, store instrumentado
//! (cuenta consultas, falla o retiene operaciones), store caído y sink que
//! registra los envíos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;

use crate::{
    models::{
        call_model::{CallClaim, CallCompletion, CallRecord, NewCall},
        notification_model::{DeliveryReceipt, NotificationChannel, NotificationRecord},
        tenant_model::{AssistantBinding, TenantConfig, UsageSummary, ZoneAssignment},
    },
    services::{
        cost_service::CostService, function_service::FunctionRegistry,
        notification_service::{NotificationService, NotificationSink},
        quota_service::QuotaService, rate_limit_service::RateLimitService,
        sqlite_store::SqliteStore, store::CallStore, tenant_service::TenantService,
        webhook_service::WebhookService, zone_service::ZoneRouter,
    },
};

pub const SECRET: &str = "vapi-test-secret";
pub const FIRST_MESSAGE: &str = "Buongiorno! Come posso aiutarla?";
pub const RATE_LIMIT_MESSAGE: &str = "Hai chiamato troppo frequentemente. Riprova più tardi.";

pub async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("No se pudo crear la base en memoria"),
    )
}

pub fn tenant(user_id: &str, zones: &[(&str, &str)]) -> TenantConfig {
    let zone_assignments: HashMap<String, ZoneAssignment> = zones
        .iter()
        .map(|(zone, number)| {
            (
                zone.to_string(),
                ZoneAssignment {
                    whatsapp: Some(number.to_string()),
                    agent_name: None,
                },
            )
        })
        .collect();

    TenantConfig {
        user_id: user_id.to_string(),
        zone_assignments,
        monthly_calls: 0,
        monthly_calls_limit: 0,
        current_month_start: Some(Utc::now()),
        subscription_plan: Some("starter".to_string()),
    }
}

pub fn new_call(call_id: &str, customer_number: &str, started_at: DateTime<Utc>) -> NewCall {
    NewCall {
        call_id: call_id.to_string(),
        customer_number: customer_number.to_string(),
        assistant_id: None,
        user_id: None,
        order_id: None,
        started_at,
    }
}

// ----------------------------------------------------------------
// Store instrumentado sobre otro store real
// ----------------------------------------------------------------
pub struct InstrumentedStore {
    inner: Arc<dyn CallStore>,
    binding_lookups: AtomicUsize,
    fail_completions: bool,
    reset_gate: Option<Barrier>,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<dyn CallStore>) -> Self {
        Self {
            inner,
            binding_lookups: AtomicUsize::new(0),
            fail_completions: false,
            reset_gate: None,
        }
    }

    /// `complete_call` falla; el resto delega.
    pub fn failing_completions(mut self) -> Self {
        self.fail_completions = true;
        self
    }

    /// Cada `reset_monthly_calls` espera a que lleguen `parties` resets.
    pub fn gated_resets(mut self, parties: usize) -> Self {
        self.reset_gate = Some(Barrier::new(parties));
        self
    }

    pub fn binding_lookups(&self) -> usize {
        self.binding_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallStore for InstrumentedStore {
    async fn count_calls_since(&self, customer_number: &str, since: DateTime<Utc>) -> Result<u64> {
        self.inner.count_calls_since(customer_number, since).await
    }

    async fn find_assistant_binding(
        &self,
        assistant_id: &str,
    ) -> Result<Option<AssistantBinding>> {
        self.binding_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_assistant_binding(assistant_id).await
    }

    async fn get_tenant(&self, user_id: &str) -> Result<Option<TenantConfig>> {
        self.inner.get_tenant(user_id).await
    }

    async fn reset_monthly_calls(
        &self,
        user_id: &str,
        month_start: DateTime<Utc>,
    ) -> Result<bool> {
        if let Some(gate) = &self.reset_gate {
            gate.wait().await;
        }
        self.inner.reset_monthly_calls(user_id, month_start).await
    }

    async fn increment_monthly_calls(&self, user_id: &str) -> Result<()> {
        self.inner.increment_monthly_calls(user_id).await
    }

    async fn create_call(&self, call: &NewCall) -> Result<()> {
        self.inner.create_call(call).await
    }

    async fn complete_call(&self, completion: &CallCompletion) -> Result<()> {
        if self.fail_completions {
            return unavailable();
        }
        self.inner.complete_call(completion).await
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>> {
        self.inner.get_call(call_id).await
    }

    async fn monthly_usage_since(&self, since: DateTime<Utc>) -> Result<UsageSummary> {
        self.inner.monthly_usage_since(since).await
    }

    async fn claim_call_event(&self, call_id: &str, claim: CallClaim) -> Result<bool> {
        self.inner.claim_call_event(call_id, claim).await
    }

    async fn record_notification(&self, record: &NotificationRecord) -> Result<()> {
        self.inner.record_notification(record).await
    }
}

// ----------------------------------------------------------------
// Store caído: todas las operaciones fallan
// ----------------------------------------------------------------
pub struct FailingStore;

fn unavailable<T>() -> Result<T> {
    Err(anyhow!("store no disponible (timeout)"))
}

#[async_trait]
impl CallStore for FailingStore {
    async fn count_calls_since(&self, _: &str, _: DateTime<Utc>) -> Result<u64> {
        unavailable()
    }

    async fn find_assistant_binding(&self, _: &str) -> Result<Option<AssistantBinding>> {
        unavailable()
    }

    async fn get_tenant(&self, _: &str) -> Result<Option<TenantConfig>> {
        unavailable()
    }

    async fn reset_monthly_calls(&self, _: &str, _: DateTime<Utc>) -> Result<bool> {
        unavailable()
    }

    async fn increment_monthly_calls(&self, _: &str) -> Result<()> {
        unavailable()
    }

    async fn create_call(&self, _: &NewCall) -> Result<()> {
        unavailable()
    }

    async fn complete_call(&self, _: &CallCompletion) -> Result<()> {
        unavailable()
    }

    async fn get_call(&self, _: &str) -> Result<Option<CallRecord>> {
        unavailable()
    }

    async fn monthly_usage_since(&self, _: DateTime<Utc>) -> Result<UsageSummary> {
        unavailable()
    }

    async fn claim_call_event(&self, _: &str, _: CallClaim) -> Result<bool> {
        unavailable()
    }

    async fn record_notification(&self, _: &NotificationRecord) -> Result<()> {
        unavailable()
    }
}

// ----------------------------------------------------------------
// Sink que guarda (destinatario, mensaje)
// ----------------------------------------------------------------
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt> {
        self.deliveries
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        if self.fail {
            return Err(anyhow!("proveedor caído"));
        }
        Ok(DeliveryReceipt {
            channel: NotificationChannel::WhatsApp,
            reference: Some("SM-test".to_string()),
        })
    }
}

/// Dispatcher completo con límites de producción y TTL de 15 minutos.
pub fn webhook_service(
    store: Arc<dyn CallStore>,
    sink: Arc<RecordingSink>,
    default_recipient: Option<&str>,
) -> WebhookService {
    WebhookService::new(
        store.clone(),
        RateLimitService::new(store.clone(), 20, 50),
        TenantService::new(store.clone(), Duration::from_secs(15 * 60)),
        ZoneRouter::new(store.clone()),
        QuotaService::new(store.clone()),
        CostService::new(store.clone(), 0.06, 100.0),
        NotificationService::new(store, sink, default_recipient.map(str::to_string)),
        FunctionRegistry::with_defaults(),
        FIRST_MESSAGE.to_string(),
        RATE_LIMIT_MESSAGE.to_string(),
    )
}
