//! services/notification_service.rs
//! Arma el mensaje del lead y lo entrega al agente por el sink configurado.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{
        call_model::{LeadDetails, NOT_SPECIFIED},
        notification_model::{DeliveryReceipt, LeadNotification, NotificationRecord},
    },
    services::store::CallStore,
};

/// Transporte de salida: `deliver(destinatario, mensaje)`.
/// La implementación decide su canal de respaldo.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt>;
}

const URGENCY_WORDS: [&str; 7] = [
    "urgente",
    "subito",
    "immediato",
    "veloce",
    "presto",
    "asap",
    "urgenza",
];

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn CallStore>,
    sink: Arc<dyn NotificationSink>,
    default_recipient: Option<String>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn CallStore>,
        sink: Arc<dyn NotificationSink>,
        default_recipient: Option<String>,
    ) -> Self {
        Self {
            store,
            sink,
            default_recipient,
        }
    }

    /// Envía el lead a `recipient_override` (zona) o al destinatario por defecto.
    pub async fn notify_lead(
        &self,
        notification: &LeadNotification,
        recipient_override: Option<String>,
    ) -> Result<DeliveryReceipt> {
        let recipient = recipient_override
            .or_else(|| self.default_recipient.clone())
            .ok_or_else(|| anyhow!("No hay destinatario para la notificación"))?;

        let message = format_lead_message(notification);
        log::info!(
            "(notify_lead) Enviando lead de call_id={} a {} ({} chars)",
            notification.call_id,
            recipient,
            message.chars().count()
        );

        let result = self.sink.deliver(&recipient, &message).await;

        let record = NotificationRecord {
            id: Uuid::new_v4().to_string(),
            call_id: notification.call_id.clone(),
            recipient: recipient.clone(),
            channel: match &result {
                Ok(receipt) => receipt.channel.as_str().to_string(),
                Err(_) => "none".to_string(),
            },
            status: if result.is_ok() { "sent" } else { "failed" }.to_string(),
            error_message: result.as_ref().err().map(|e| format!("{:?}", e)),
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.record_notification(&record).await {
            log::error!("(notify_lead) No se pudo registrar la notificación: {:?}", e);
        }

        match &result {
            Ok(receipt) => log::info!(
                "(notify_lead) Lead enviado por {} (ref={:?})",
                receipt.channel.as_str(),
                receipt.reference
            ),
            Err(e) => log::error!("(notify_lead) Falló el envío a {}: {:?}", recipient, e),
        }
        result
    }
}

fn or_placeholder(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SPECIFIED)
}

/// Mensaje completo para el agente inmobiliario.
pub fn format_lead_message(notification: &LeadNotification) -> String {
    let lead = &notification.lead;
    let nome = or_placeholder(&lead.nome);
    let telefono = lead.contact_phone(&notification.caller_number);

    let urgent = lead
        .note
        .as_deref()
        .map(|note| {
            let note = note.to_lowercase();
            URGENCY_WORDS.iter().any(|word| note.contains(word))
        })
        .unwrap_or(false);
    let urgency_symbol = if urgent { "🚨" } else { "📞" };

    let mut parts = vec![format!("{} *Nuovo Lead - {}*", urgency_symbol, nome), String::new()];

    let mut search = Vec::new();
    if let Some(tipo) = &lead.tipo_richiesta {
        if tipo.to_lowercase() == "comprare" {
            search.push("Cerca di comprare".to_string());
        } else {
            search.push("Vuole vendere".to_string());
        }
    }
    if let Some(immobile) = &lead.tipo_immobile {
        search.push(format!("un {}", immobile.to_lowercase()));
    }
    if let Some(zona) = &lead.zona {
        search.push(format!("in zona {}", zona));
    }
    if let Some(budget) = &lead.budget {
        search.push(format!("con budget {}", budget));
    }
    if !search.is_empty() {
        parts.push(format!("🎯 {}", search.join(" ")));
        parts.push(String::new());
    }

    parts.push(format!("📞 *Contatto:* {}", telefono));
    if let Some(duration) = notification.duration {
        let duration = duration.max(0);
        parts.push(format!("⏱ *Durata:* {}:{:02}", duration / 60, duration % 60));
    }
    if let Some(note) = &lead.note {
        parts.push(format!("📝 *Dettagli:* {}", note));
    }

    parts.push(String::new());
    parts.push("━━━━━━━━━━━━━━━━".to_string());
    parts.push("💡 *COSA PROPORGLI*".to_string());
    parts.push(String::new());
    parts.push(generate_recommendation(lead));

    parts.join("\n")
}

/// Resumen de qué proponerle según lo que dijo en la llamada.
fn generate_recommendation(lead: &LeadDetails) -> String {
    let mut rec_parts = Vec::new();

    if let Some(immobile) = &lead.tipo_immobile {
        rec_parts.push(format!("Immobile ideale: *{}*", immobile));
    }
    if let Some(zona) = &lead.zona {
        rec_parts.push(format!("Zona target: *{}*", zona));
    }
    if let Some(budget) = &lead.budget {
        if budget.to_lowercase() != "n/a" {
            rec_parts.push(format!("Range prezzo: *{}*", budget));
        }
    }
    if let Some(note) = &lead.note {
        let features = must_have_features(&note.to_lowercase());
        if !features.is_empty() {
            rec_parts.push(format!("Must-have: {}", features.join(", ")));
        }
    }

    let action = match lead.tipo_richiesta.as_deref().map(str::to_lowercase).as_deref() {
        Some("comprare") => "Mostragli immobili disponibili che matchano questi criteri",
        Some("vendere") => "Fissa appuntamento per valutazione immobile",
        _ => "Contattalo per capire meglio le sue esigenze",
    };

    if rec_parts.is_empty() {
        format!("→ *{}*", action)
    } else {
        format!("{}\n\n→ *{}*", rec_parts.join("\n"), action)
    }
}

fn must_have_features(note: &str) -> Vec<&'static str> {
    let rules: [(&[&str], &'static str); 9] = [
        (&["balcon"], "balcone"),
        (&["terrazzo", "terrazza"], "terrazzo"),
        (&["luce", "luminoso", "sole"], "luminoso"),
        (&["piano alto", "ultimo piano"], "piano alto"),
        (&["ascensore"], "con ascensore"),
        (&["garage", "box", "posto auto"], "posto auto"),
        (&["cantina"], "cantina"),
        (&["ristrutturato", "nuovo"], "ristrutturato"),
        (&["arredato"], "arredato"),
    ];

    rules
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| note.contains(k)))
        .map(|(_, feature)| *feature)
        .collect()
}
