use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::call_model::LeadDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    WhatsApp,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::WhatsApp => "whatsapp",
            NotificationChannel::Sms => "sms",
        }
    }
}

/// Resultado de una entrega exitosa
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub channel: NotificationChannel,
    /// Identificador del proveedor (SID de Twilio, etc.)
    pub reference: Option<String>,
}

/// Fila de la tabla `notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub call_id: String,
    pub recipient: String,
    pub channel: String, // "whatsapp", "sms"
    pub status: String,  // "sent", "failed"
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Todo lo necesario para armar el mensaje al agente
#[derive(Debug, Clone)]
pub struct LeadNotification {
    pub call_id: String,
    pub caller_number: String,
    pub lead: LeadDetails,
    pub duration: Option<i64>,
}
