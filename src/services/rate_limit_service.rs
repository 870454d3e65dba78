//! services/rate_limit_service.rs
//! Rate limiting por número llamante, contando llamadas en el store.
//! Nunca limita por tráfico agregado: un llamante abusivo no afecta a otros.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::services::store::CallStore;

/// Un cliente real no llama 20 veces en una hora
pub const MAX_CALLS_PER_NUMBER_PER_HOUR: u64 = 20;
pub const MAX_CALLS_PER_NUMBER_PER_DAY: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    HourlyExceeded { calls: u64 },
    DailyExceeded { calls: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn CallStore>,
    max_per_hour: u64,
    max_per_day: u64,
}

impl RateLimitService {
    pub fn new(store: Arc<dyn CallStore>, max_per_hour: u64, max_per_day: u64) -> Self {
        RateLimitService {
            store,
            max_per_hour,
            max_per_day,
        }
    }

    pub async fn check(&self, customer_number: &str) -> RateLimitDecision {
        self.check_at(customer_number, Utc::now()).await
    }

    /// Si el store falla se permite la llamada (fail-open).
    pub async fn check_at(&self, customer_number: &str, now: DateTime<Utc>) -> RateLimitDecision {
        // Número oculto: no hay identidad por la que limitar
        if customer_number.trim().is_empty() {
            log::debug!("Llamada sin número, se omite el rate limit");
            return RateLimitDecision::Allowed;
        }

        match self.evaluate(customer_number, now).await {
            Ok(decision) => decision,
            Err(e) => {
                log::error!(
                    "Error comprobando rate limit para {}: {:?}. Se permite la llamada.",
                    customer_number,
                    e
                );
                RateLimitDecision::Allowed
            }
        }
    }

    async fn evaluate(&self, customer_number: &str, now: DateTime<Utc>) -> Result<RateLimitDecision> {
        let calls_last_hour = self
            .store
            .count_calls_since(customer_number, now - Duration::hours(1))
            .await?;
        if calls_last_hour >= self.max_per_hour {
            log::warn!(
                "Rate limit superado para {}: {} llamadas en 1 hora",
                customer_number,
                calls_last_hour
            );
            return Ok(RateLimitDecision::HourlyExceeded {
                calls: calls_last_hour,
            });
        }

        let calls_last_day = self
            .store
            .count_calls_since(customer_number, now - Duration::hours(24))
            .await?;
        if calls_last_day >= self.max_per_day {
            log::warn!(
                "Rate limit diario superado para {}: {} llamadas en 24h",
                customer_number,
                calls_last_day
            );
            return Ok(RateLimitDecision::DailyExceeded {
                calls: calls_last_day,
            });
        }

        Ok(RateLimitDecision::Allowed)
    }
}
