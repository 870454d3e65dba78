//! services/tenant_service.rs
//! Resolución assistant -> (tenant, order) con caché en memoria.
//!
//! La caché vive sólo en el proceso: se llena bajo demanda, no se persiste y
//! puede reconstruirse desde el store partiendo de vacío. Los resultados
//! negativos no se cachean, así una order recién vinculada se ve en la
//! siguiente llamada.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::{models::tenant_model::AssistantBinding, services::store::CallStore};

pub const ASSISTANT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    binding: AssistantBinding,
    created_at: Instant,
}

/// Mapa sincronizado con expiración por entrada.
#[derive(Debug)]
pub struct AssistantCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl AssistantCache {
    pub fn new(ttl: Duration) -> Self {
        AssistantCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Entrada vigente (edad < TTL).
    pub fn get(&self, assistant_id: &str) -> Option<AssistantBinding> {
        let entries = self.entries.read();
        entries
            .get(assistant_id)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .map(|entry| entry.binding.clone())
    }

    pub fn insert(&self, binding: AssistantBinding) {
        let mut entries = self.entries.write();
        // Aprovechamos la escritura para descartar entradas vencidas
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
        entries.insert(
            binding.assistant_id.clone(),
            CacheEntry {
                binding,
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[derive(Clone)]
pub struct TenantService {
    store: Arc<dyn CallStore>,
    cache: Arc<AssistantCache>,
}

impl TenantService {
    pub fn new(store: Arc<dyn CallStore>, ttl: Duration) -> Self {
        TenantService {
            store,
            cache: Arc::new(AssistantCache::new(ttl)),
        }
    }

    /// Devuelve el binding o `None` si el assistant es desconocido o el
    /// store falla.
    pub async fn resolve(&self, assistant_id: Option<&str>) -> Option<AssistantBinding> {
        let assistant_id = assistant_id.map(str::trim).filter(|id| !id.is_empty())?;

        if let Some(binding) = self.cache.get(assistant_id) {
            log::debug!("Cache hit para assistant {}", assistant_id);
            return Some(binding);
        }

        match self.store.find_assistant_binding(assistant_id).await {
            Ok(Some(binding)) => {
                self.cache.insert(binding.clone());
                log::debug!(
                    "Cacheado assistant {} -> user {} ({} entradas)",
                    assistant_id,
                    binding.user_id,
                    self.cache.len()
                );
                Some(binding)
            }
            Ok(None) => {
                log::info!("No hay order asociada al assistant {}", assistant_id);
                None
            }
            Err(e) => {
                log::error!("Error obteniendo tenant del assistant {}: {:?}", assistant_id, e);
                None
            }
        }
    }
}
