//! models/webhook_model.rs
//! Eventos entrantes de la plataforma de voz y las respuestas que espera.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{call_model::UNKNOWN_ENDED_REASON, lenient};

pub const EVENT_CALL_START: &str = "assistant-request";
pub const EVENT_CALL_END: &str = "end-of-call-report";
pub const EVENT_FUNCTION_CALL: &str = "function-call";

/// Cuerpo completo del webhook: `{"message": {...}}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookEnvelope {
    #[serde(deserialize_with = "lenient::or_default")]
    pub message: EventMessage,
    #[serde(rename = "assistantId", deserialize_with = "lenient::opt_string")]
    pub assistant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub event_type: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub call: CallPayload,
    #[serde(rename = "assistantId", deserialize_with = "lenient::opt_string")]
    pub assistant_id: Option<String>,
    #[serde(rename = "structuredData", deserialize_with = "lenient::or_default")]
    pub structured_data: Map<String, Value>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub analysis: AnalysisPayload,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub transcript: Option<String>,
    #[serde(rename = "durationSeconds", deserialize_with = "lenient::opt_seconds")]
    pub duration_seconds: Option<i64>,
    #[serde(rename = "endedReason", deserialize_with = "lenient::opt_string")]
    pub ended_reason: Option<String>,
    #[serde(rename = "functionCall", deserialize_with = "lenient::or_default")]
    pub function_call: FunctionCallPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallPayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub customer: CustomerPayload,
    #[serde(rename = "assistantId", deserialize_with = "lenient::opt_string")]
    pub assistant_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_seconds")]
    pub duration: Option<i64>,
    #[serde(rename = "endedReason", deserialize_with = "lenient::opt_string")]
    pub ended_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerPayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisPayload {
    #[serde(rename = "structuredData", deserialize_with = "lenient::or_default")]
    pub structured_data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionCallPayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    pub parameters: Value,
}

impl WebhookEnvelope {
    pub fn event_type(&self) -> &str {
        self.message.event_type.as_deref().unwrap_or_default()
    }

    pub fn call_id(&self) -> &str {
        self.message.call.id.as_deref().unwrap_or_default()
    }

    pub fn customer_number(&self) -> &str {
        self.message.call.customer.number.as_deref().unwrap_or_default()
    }

    /// El assistant puede venir en la llamada, en el mensaje o en la raíz.
    pub fn assistant_id(&self) -> Option<&str> {
        self.message
            .call
            .assistant_id
            .as_deref()
            .or(self.message.assistant_id.as_deref())
            .or(self.assistant_id.as_deref())
    }

    pub fn duration(&self) -> Option<i64> {
        self.message.call.duration.or(self.message.duration_seconds)
    }

    pub fn ended_reason(&self) -> &str {
        self.message
            .call
            .ended_reason
            .as_deref()
            .or(self.message.ended_reason.as_deref())
            .unwrap_or(UNKNOWN_ENDED_REASON)
    }

    /// Datos estructurados; si no vienen en el mensaje se buscan en `analysis`.
    pub fn structured_data(&self) -> &Map<String, Value> {
        if self.message.structured_data.is_empty() {
            &self.message.analysis.structured_data
        } else {
            &self.message.structured_data
        }
    }
}

/// Respuestas que entiende la plataforma (siempre HTTP 200).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum WebhookResponse {
    Assistant { assistant: AssistantOverrides },
    EndCall { error: EndCallDirective },
    FunctionResult { result: Value },
    Status { status: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssistantOverrides {
    #[serde(rename = "firstMessage")]
    pub first_message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EndCallDirective {
    pub message: String,
    #[serde(rename = "endCall")]
    pub end_call: bool,
}

impl WebhookResponse {
    pub fn first_message(message: impl Into<String>) -> Self {
        WebhookResponse::Assistant {
            assistant: AssistantOverrides {
                first_message: message.into(),
            },
        }
    }

    pub fn end_call(message: impl Into<String>) -> Self {
        WebhookResponse::EndCall {
            error: EndCallDirective {
                message: message.into(),
                end_call: true,
            },
        }
    }

    pub fn success() -> Self {
        WebhookResponse::Status {
            status: "success".to_string(),
        }
    }

    pub fn ok() -> Self {
        WebhookResponse::Status {
            status: "ok".to_string(),
        }
    }
}
