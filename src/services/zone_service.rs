//! services/zone_service.rs
//! Routing del lead al agente asignado a la zona.
//! Cualquier fallo devuelve `None` (se usa el destinatario por defecto):
//! el routing nunca bloquea la notificación.

use std::sync::Arc;

use anyhow::Result;

use crate::{models::call_model::NOT_SPECIFIED, services::store::CallStore};

/// "Porta  Romana " -> "porta-romana"
pub fn normalize_zone_name(zone: &str) -> Option<String> {
    let normalized = zone
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Los agentes se guardan con o sin prefijo de canal.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[derive(Clone)]
pub struct ZoneRouter {
    store: Arc<dyn CallStore>,
}

impl ZoneRouter {
    pub fn new(store: Arc<dyn CallStore>) -> Self {
        ZoneRouter { store }
    }

    pub async fn route(&self, zone: Option<&str>, user_id: Option<&str>) -> Option<String> {
        let zone = zone.filter(|z| !z.trim().is_empty() && *z != NOT_SPECIFIED)?;
        let user_id = user_id.filter(|u| !u.is_empty())?;

        match self.lookup(zone, user_id).await {
            Ok(recipient) => recipient,
            Err(e) => {
                log::error!("Error buscando agente para zona '{}': {:?}", zone, e);
                None
            }
        }
    }

    async fn lookup(&self, zone: &str, user_id: &str) -> Result<Option<String>> {
        let Some(zone_key) = normalize_zone_name(zone) else {
            return Ok(None);
        };

        let Some(tenant) = self.store.get_tenant(user_id).await? else {
            log::warn!("Tenant {} no encontrado, se usa el destinatario por defecto", user_id);
            return Ok(None);
        };

        let recipient = tenant
            .zone_assignments
            .get(&zone_key)
            .and_then(|assignment| {
                log::debug!(
                    "Zona '{}' asignada a {:?} para user {}",
                    zone_key,
                    assignment.agent_name,
                    user_id
                );
                assignment.whatsapp.as_deref()
            })
            .map(str::trim)
            .filter(|number| !number.is_empty())
            .map(whatsapp_address);

        match &recipient {
            Some(address) => log::info!("Zona '{}' -> {} (user {})", zone, address, user_id),
            None => log::info!("Zona '{}' sin agente para user {}, uso default", zone, user_id),
        }
        Ok(recipient)
    }
}
