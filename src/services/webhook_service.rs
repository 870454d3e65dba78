//! services/webhook_service.rs
//! Máquina de estados por llamada: unknown -> in_progress -> completed.
//! Cada evento se procesa de forma independiente y concurrente; ningún
//! fallo de dependencias se propaga a la respuesta del webhook.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    models::{
        call_model::{CallClaim, CallCompletion, LeadDetails, NewCall},
        notification_model::LeadNotification,
        webhook_model::{
            WebhookEnvelope, WebhookResponse, EVENT_CALL_END, EVENT_CALL_START,
            EVENT_FUNCTION_CALL,
        },
    },
    services::{
        cost_service::CostService, function_service::FunctionRegistry,
        notification_service::NotificationService, quota_service::QuotaService,
        rate_limit_service::RateLimitService, store::CallStore, tenant_service::TenantService,
        zone_service::ZoneRouter,
    },
};

#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn CallStore>,
    rate_limiter: RateLimitService,
    tenants: TenantService,
    zones: ZoneRouter,
    quota: QuotaService,
    costs: CostService,
    notifications: NotificationService,
    functions: Arc<FunctionRegistry>,
    first_message: String,
    rate_limit_message: String,
}

impl WebhookService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn CallStore>,
        rate_limiter: RateLimitService,
        tenants: TenantService,
        zones: ZoneRouter,
        quota: QuotaService,
        costs: CostService,
        notifications: NotificationService,
        functions: FunctionRegistry,
        first_message: String,
        rate_limit_message: String,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            tenants,
            zones,
            quota,
            costs,
            notifications,
            functions: Arc::new(functions),
            first_message,
            rate_limit_message,
        }
    }

    /// Asume que la firma ya fue verificada.
    pub async fn handle_event(&self, event: WebhookEnvelope) -> WebhookResponse {
        let event_type = event.event_type();
        log::info!("Evento recibido: '{}' (call_id={})", event_type, event.call_id());

        match event_type {
            EVENT_CALL_START => self.handle_call_start(&event).await,
            EVENT_CALL_END => self.handle_call_end(&event).await,
            EVENT_FUNCTION_CALL => self.handle_function_call(&event),
            other => {
                log::info!("Tipo de evento no manejado: '{}'", other);
                WebhookResponse::ok()
            }
        }
    }

    async fn handle_call_start(&self, event: &WebhookEnvelope) -> WebhookResponse {
        let call_id = event.call_id();
        let customer_number = event.customer_number();
        let assistant_id = event.assistant_id();

        log::info!(
            "Nueva llamada {} desde '{}', assistant {:?}",
            call_id,
            customer_number,
            assistant_id
        );

        let decision = self.rate_limiter.check(customer_number).await;
        if !decision.is_allowed() {
            log::warn!(
                "Llamada {} rechazada por rate limit ({:?})",
                call_id,
                decision
            );
            return WebhookResponse::end_call(self.rate_limit_message.clone());
        }

        if let Some(report) = self.costs.check_monthly_costs().await {
            log::debug!(
                "Costo del mes: {} llamadas, {}s, €{:.2} (alerta={})",
                report.calls,
                report.total_duration_secs,
                report.estimated_cost_eur,
                report.over_threshold
            );
        }

        let binding = self.tenants.resolve(assistant_id).await;

        if call_id.is_empty() {
            log::warn!("assistant-request sin call.id: no se guarda el inicio");
        } else {
            let new_call = NewCall {
                call_id: call_id.to_string(),
                customer_number: customer_number.to_string(),
                assistant_id: assistant_id.map(str::to_string),
                user_id: binding.as_ref().map(|b| b.user_id.clone()),
                order_id: binding.as_ref().map(|b| b.order_id.clone()),
                started_at: Utc::now(),
            };
            if let Err(e) = self.store.create_call(&new_call).await {
                log::error!("Error guardando inicio de llamada {}: {:?}", call_id, e);
            }
        }

        WebhookResponse::first_message(self.first_message.clone())
    }

    async fn handle_call_end(&self, event: &WebhookEnvelope) -> WebhookResponse {
        let call_id = event.call_id();
        let customer_number = event.customer_number();
        let duration = event.duration();
        let ended_reason = event.ended_reason();
        let structured_data = event.structured_data();
        let transcript = event.message.transcript.clone();

        log::info!(
            "Llamada terminada: {}, duración: {:?}s, motivo: {}",
            call_id,
            duration,
            ended_reason
        );
        log::info!("Datos estructurados: {}", Value::Object(structured_data.clone()));

        let lead = LeadDetails::from_structured(structured_data);

        let assistant_id = event.assistant_id();
        let binding = self.tenants.resolve(assistant_id).await;

        // El tenant fijado al inicio de la llamada no cambia
        let existing = if call_id.is_empty() {
            None
        } else {
            match self.store.get_call(call_id).await {
                Ok(call) => call,
                Err(e) => {
                    log::error!("Error leyendo llamada {}: {:?}", call_id, e);
                    None
                }
            }
        };
        let user_id = existing
            .as_ref()
            .and_then(|c| c.user_id.clone())
            .or_else(|| binding.as_ref().map(|b| b.user_id.clone()));
        let order_id = existing
            .as_ref()
            .and_then(|c| c.order_id.clone())
            .or_else(|| binding.as_ref().map(|b| b.order_id.clone()));

        let destination = self
            .zones
            .route(lead.zona.as_deref(), user_id.as_deref())
            .await;
        log::info!(
            "Routing zona {:?} a: {:?} (user: {:?})",
            lead.zona,
            destination,
            user_id
        );

        // Cuota antes que persistencia: un fallo al guardar no salta el conteo
        if let Some(user_id) = user_id.as_deref() {
            if self.claim(call_id, CallClaim::Usage).await {
                if let Some(status) = self.quota.record_call(user_id).await {
                    log::info!(
                        "Contador mensual de {}: {}/{} (reset={})",
                        user_id,
                        status.monthly_calls,
                        status.monthly_limit,
                        status.month_reset
                    );
                }
            } else {
                log::info!("Llamada {} ya contada para {}, se omite", call_id, user_id);
            }
        }

        if call_id.is_empty() {
            log::warn!("end-of-call-report sin call.id: no se guarda la llamada");
        } else {
            let completion = CallCompletion {
                call_id: call_id.to_string(),
                customer_number: customer_number.to_string(),
                assistant_id: assistant_id.map(str::to_string),
                user_id: user_id.clone(),
                order_id,
                ended_at: Utc::now(),
                duration,
                ended_reason: ended_reason.to_string(),
                transcript,
                structured_data: structured_data.clone(),
                client_info: lead.clone(),
            };

            match self.store.complete_call(&completion).await {
                Ok(()) => log::info!("Llamada {} guardada", call_id),
                Err(e) => log::error!("Error guardando fin de llamada {}: {:?}", call_id, e),
            }
        }

        if !lead.is_identifying(customer_number) {
            log::warn!(
                "Se omite la notificación: datos insuficientes para la llamada {}",
                call_id
            );
            return WebhookResponse::success();
        }

        if !self.claim(call_id, CallClaim::Notification).await {
            log::info!("Notificación de la llamada {} ya enviada, se omite", call_id);
            return WebhookResponse::success();
        }

        let notification = LeadNotification {
            call_id: call_id.to_string(),
            caller_number: customer_number.to_string(),
            lead,
            duration,
        };
        if let Err(e) = self.notifications.notify_lead(&notification, destination).await {
            log::error!("Error enviando notificación de la llamada {}: {:?}", call_id, e);
        }

        WebhookResponse::success()
    }

    /// Idempotencia ante end-of-call duplicados. Sin `call_id` no hay con qué
    /// deduplicar; si el store no responde se aplica igual.
    async fn claim(&self, call_id: &str, claim: CallClaim) -> bool {
        if call_id.is_empty() {
            return true;
        }
        match self.store.claim_call_event(call_id, claim).await {
            Ok(claimed) => claimed,
            Err(e) => {
                log::error!(
                    "No se pudo reservar '{}' de {}: {:?}. Se aplica igual.",
                    claim,
                    call_id,
                    e
                );
                true
            }
        }
    }

    fn handle_function_call(&self, event: &WebhookEnvelope) -> WebhookResponse {
        let function_call = &event.message.function_call;
        let name = function_call.name.as_deref().unwrap_or_default();

        log::info!(
            "Function call: {} con parámetros {}",
            name,
            function_call.parameters
        );

        match self.functions.invoke(name, &function_call.parameters) {
            Some(result) => WebhookResponse::FunctionResult { result },
            None => {
                log::info!("Función '{}' no implementada", name);
                WebhookResponse::FunctionResult {
                    result: json!("Function not implemented"),
                }
            }
        }
    }
}
