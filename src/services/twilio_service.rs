//! services/twilio_service.rs
//! Sink de notificaciones sobre la API REST de Twilio.
//! Canal principal WhatsApp; si falla, un único intento por SMS.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::{
    models::notification_model::{DeliveryReceipt, NotificationChannel},
    services::{notification_service::NotificationSink, zone_service::whatsapp_address},
};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub api_url: String,
    /// Remitente WhatsApp ("whatsapp:+1415...")
    pub whatsapp_from: String,
    /// Remitente y destino del SMS de respaldo
    pub sms_from: Option<String>,
    pub sms_to: Option<String>,
    pub timeout: Duration,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        TwilioConfig {
            account_sid: None,
            auth_token: None,
            api_url: "https://api.twilio.com".to_string(),
            whatsapp_from: "whatsapp:+14155238886".to_string(),
            sms_from: None,
            sms_to: None,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone)]
pub struct TwilioNotifier {
    http_client: Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("No se pudo crear el cliente HTTP para Twilio")?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.account_sid.is_some() && self.config.auth_token.is_some()
    }

    async fn send_message(&self, from: &str, to: &str, body: &str) -> Result<Option<String>> {
        let (Some(sid), Some(token)) = (&self.config.account_sid, &self.config.auth_token) else {
            return Err(anyhow!("Cliente Twilio no configurado"));
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_url.trim_end_matches('/'),
            sid
        );
        log::info!("(send_message) POST a Twilio: from={}, to={}", from, to);

        let resp = self
            .http_client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await
            .context("(send_message) Fallo al hacer POST a Twilio")?;

        let status = resp.status();
        if !status.is_success() {
            let body_txt = resp.text().await.unwrap_or_default();
            log::error!("(send_message) Twilio respondió {}: '{}'", status, body_txt);
            return Err(anyhow!("Twilio respondió {}: {}", status, body_txt));
        }

        let json_val = resp.json::<serde_json::Value>().await.unwrap_or_default();
        Ok(json_val
            .get("sid")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn send_sms_fallback(&self, body: &str) -> Result<DeliveryReceipt> {
        let (Some(from), Some(to)) = (&self.config.sms_from, &self.config.sms_to) else {
            return Err(anyhow!("SMS de respaldo no configurado"));
        };
        let sms_body = format!("[CENTRALINISTA AI]\n\n{}", body);
        let reference = self.send_message(from, to, &sms_body).await?;
        Ok(DeliveryReceipt {
            channel: NotificationChannel::Sms,
            reference,
        })
    }
}

#[async_trait]
impl NotificationSink for TwilioNotifier {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt> {
        let from = whatsapp_address(&self.config.whatsapp_from);
        let to = whatsapp_address(recipient);

        match self.send_message(&from, &to, body).await {
            Ok(reference) => {
                log::info!("(deliver) WhatsApp enviado, SID={:?}", reference);
                Ok(DeliveryReceipt {
                    channel: NotificationChannel::WhatsApp,
                    reference,
                })
            }
            Err(primary) => {
                log::error!("(deliver) Falló WhatsApp: {:?}. Probando SMS...", primary);
                self.send_sms_fallback(body).await.map_err(|fallback| {
                    anyhow!("WhatsApp: {:#}; SMS: {:#}", primary, fallback)
                })
            }
        }
    }
}
