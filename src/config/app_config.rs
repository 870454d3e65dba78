//! config/app_config.rs
//! Configuración global del servicio, leída de variables de entorno (.env).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::rate_limit_service::{MAX_CALLS_PER_NUMBER_PER_DAY, MAX_CALLS_PER_NUMBER_PER_HOUR};
use crate::services::tenant_service::ASSISTANT_CACHE_TTL;
use crate::services::twilio_service::TwilioConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,

    /// Secreto HMAC compartido con la plataforma. Sin secreto se rechaza todo.
    pub webhook_secret: Option<String>,

    pub database_url: String,
    pub database_timeout: Duration,

    pub max_calls_per_hour: u64,
    pub max_calls_per_day: u64,
    pub assistant_cache_ttl: Duration,

    pub cost_per_minute_eur: f64,
    pub cost_alert_threshold_eur: f64,

    pub first_message: String,
    pub rate_limit_message: String,

    pub twilio: TwilioConfig,
    /// Destinatario por defecto cuando la zona no tiene agente asignado
    pub default_recipient: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 5022,
            workers: None,
            webhook_secret: None,
            database_url: "sqlite:data/calls.db".to_string(),
            database_timeout: Duration::from_secs(5),
            max_calls_per_hour: MAX_CALLS_PER_NUMBER_PER_HOUR,
            max_calls_per_day: MAX_CALLS_PER_NUMBER_PER_DAY,
            assistant_cache_ttl: ASSISTANT_CACHE_TTL,
            cost_per_minute_eur: 0.06,
            cost_alert_threshold_eur: 100.0,
            first_message: "Buongiorno! Sono l'assistente virtuale. Come posso aiutarla oggi?"
                .to_string(),
            rate_limit_message: "Hai chiamato troppo frequentemente. Riprova più tardi."
                .to_string(),
            twilio: TwilioConfig::default(),
            default_recipient: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let twilio = TwilioConfig {
            account_sid: env_string("TWILIO_ACCOUNT_SID"),
            auth_token: env_string("TWILIO_AUTH_TOKEN"),
            api_url: env_string("TWILIO_API_URL").unwrap_or(defaults.twilio.api_url),
            whatsapp_from: env_string("TWILIO_WHATSAPP_NUMBER")
                .unwrap_or(defaults.twilio.whatsapp_from),
            sms_from: env_string("TWILIO_PHONE_NUMBER"),
            sms_to: env_string("TWILIO_DESTINATION_SMS"),
            timeout: Duration::from_secs(env_parse("TWILIO_TIMEOUT_SECS", 15)),
        };

        AppConfig {
            host: env_string("SERVER_HOST").unwrap_or(defaults.host),
            port: env_parse("SERVER_PORT", defaults.port),
            workers: env_string("SERVER_WORKERS").and_then(|w| w.parse().ok()),
            webhook_secret: env_string("VAPI_WEBHOOK_SECRET").or_else(|| env_string("VAPI_API_KEY")),
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            database_timeout: Duration::from_secs(env_parse(
                "DATABASE_TIMEOUT_SECS",
                defaults.database_timeout.as_secs(),
            )),
            max_calls_per_hour: env_parse("RATE_LIMIT_PER_HOUR", defaults.max_calls_per_hour),
            max_calls_per_day: env_parse("RATE_LIMIT_PER_DAY", defaults.max_calls_per_day),
            assistant_cache_ttl: Duration::from_secs(env_parse(
                "ASSISTANT_CACHE_TTL_SECS",
                defaults.assistant_cache_ttl.as_secs(),
            )),
            cost_per_minute_eur: env_parse("COST_PER_MINUTE_EUR", defaults.cost_per_minute_eur),
            cost_alert_threshold_eur: env_parse(
                "COST_ALERT_THRESHOLD_EUR",
                defaults.cost_alert_threshold_eur,
            ),
            first_message: env_string("ASSISTANT_FIRST_MESSAGE").unwrap_or(defaults.first_message),
            rate_limit_message: env_string("RATE_LIMIT_MESSAGE")
                .unwrap_or(defaults.rate_limit_message),
            twilio,
            default_recipient: env_string("TWILIO_DESTINATION_WHATSAPP"),
        }
    }
}

/// Variable de entorno no vacía
fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Valor inválido para {}='{}', usando el valor por defecto", key, raw);
            default
        }),
        None => default,
    }
}
