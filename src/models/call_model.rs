//! models/call_model.rs
//! Registro de llamadas y datos del lead extraídos de la conversación.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::lenient::string_from_value;

/// Texto que se usa cuando un campo del lead no viene.
pub const NOT_SPECIFIED: &str = "Non specificato";

/// Motivo de fin cuando el evento no lo trae.
pub const UNKNOWN_ENDED_REASON: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    InProgress,
    Completed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            other => Err(anyhow!("Estado de llamada desconocido: {}", other)),
        }
    }
}

/// Efectos del end-of-call que se aplican una vez por llamada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClaim {
    /// Incremento del contador mensual del tenant
    Usage,
    /// Envío del lead al agente
    Notification,
}

impl CallClaim {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallClaim::Usage => "usage",
            CallClaim::Notification => "notification",
        }
    }
}

impl fmt::Display for CallClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fila completa de la colección `calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub customer_number: String,
    pub assistant_id: Option<String>,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub status: CallStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub ended_reason: Option<String>,
    pub transcript: Option<String>,
    pub structured_data: Map<String, Value>,
    pub client_info: Option<LeadDetails>,
}

/// Datos que se guardan al iniciar la llamada.
#[derive(Debug, Clone)]
pub struct NewCall {
    pub call_id: String,
    pub customer_number: String,
    pub assistant_id: Option<String>,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Datos que se fusionan al terminar la llamada.
#[derive(Debug, Clone)]
pub struct CallCompletion {
    pub call_id: String,
    pub customer_number: String,
    pub assistant_id: Option<String>,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub ended_at: DateTime<Utc>,
    pub duration: Option<i64>,
    pub ended_reason: String,
    pub transcript: Option<String>,
    pub structured_data: Map<String, Value>,
    pub client_info: LeadDetails,
}

/// Campos del lead tal como los extrae el structured output del assistant.
/// Los campos ausentes no se serializan: el JSON guardado se fusiona por clave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_richiesta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_immobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Sólo los dígitos: "+39 333-000 0000" y "+393330000000" son el mismo número.
fn phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl LeadDetails {
    pub fn from_structured(data: &Map<String, Value>) -> Self {
        let field = |key: &str| {
            data.get(key)
                .and_then(string_from_value)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != NOT_SPECIFIED)
        };

        LeadDetails {
            nome: field("nome"),
            telefono: field("telefono"),
            tipo_richiesta: field("tipo_richiesta"),
            zona: field("zona"),
            tipo_immobile: field("tipo_immobile"),
            budget: field("budget"),
            note: field("note"),
        }
    }

    /// Hay lead si tenemos nombre o un teléfono distinto al número que llamó.
    pub fn is_identifying(&self, caller_number: &str) -> bool {
        if self.nome.is_some() {
            return true;
        }
        let Some(phone) = self.telefono.as_deref() else {
            return false;
        };
        let (phone_key, caller_key) = (phone_digits(phone), phone_digits(caller_number));
        if phone_key.is_empty() || caller_key.is_empty() {
            return phone.trim() != caller_number.trim();
        }
        phone_key != caller_key
    }

    /// Teléfono de contacto: el dictado en la llamada o, si no, el llamante.
    pub fn contact_phone<'a>(&'a self, caller_number: &'a str) -> &'a str {
        self.telefono.as_deref().unwrap_or(caller_number)
    }
}
