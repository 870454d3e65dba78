//! services/sqlite_store.rs
//! Implementación de `CallStore` sobre SQLite (sqlx).

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};

use crate::{
    models::{
        call_model::{
            CallClaim, CallCompletion, CallRecord, CallStatus, LeadDetails, NewCall,
            UNKNOWN_ENDED_REASON,
        },
        notification_model::NotificationRecord,
        tenant_model::{AssistantBinding, TenantConfig, UsageSummary},
    },
    services::store::CallStore,
};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    db_pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        SqliteStore { db_pool }
    }

    /// Abre (o crea) la base. `timeout` acota tanto la espera por conexión
    /// como los bloqueos de SQLite.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("DATABASE_URL inválida: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        let db_pool = SqlitePoolOptions::new()
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .context("No se pudo conectar a la base de datos SQLite")?;

        Ok(Self::new(db_pool))
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Fallo en migraciones")?;
        Ok(())
    }
}

/// Formato fijo (milisegundos, sufijo Z) para que las comparaciones de texto
/// en SQL coincidan con el orden temporal. Es el mismo que produce
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn call_from_row(row: &SqliteRow) -> Result<CallRecord> {
    let status: String = row.try_get("status")?;
    let structured_data: Option<String> = row.try_get("structured_data")?;
    let client_info: Option<String> = row.try_get("client_info")?;

    let structured_data = match structured_data {
        Some(raw) => serde_json::from_str::<Map<String, Value>>(&raw)
            .context("structured_data corrupto")?,
        None => Map::new(),
    };
    let client_info = match client_info {
        Some(raw) => Some(serde_json::from_str::<LeadDetails>(&raw).context("client_info corrupto")?),
        None => None,
    };

    Ok(CallRecord {
        call_id: row.try_get("call_id")?,
        customer_number: row.try_get("customer_number")?,
        assistant_id: row.try_get("assistant_id")?,
        user_id: row.try_get("user_id")?,
        order_id: row.try_get("order_id")?,
        status: status.parse::<CallStatus>()?,
        started_at: parse_timestamp(row.try_get("started_at")?),
        ended_at: parse_timestamp(row.try_get("ended_at")?),
        duration: row.try_get("duration")?,
        ended_reason: row.try_get("ended_reason")?,
        transcript: row.try_get("transcript")?,
        structured_data,
        client_info,
    })
}

#[async_trait]
impl CallStore for SqliteStore {
    async fn count_calls_since(&self, customer_number: &str, since: DateTime<Utc>) -> Result<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM calls
            WHERE customer_number = ?1
              AND started_at >= ?2
            "#,
        )
        .bind(customer_number)
        .bind(format_timestamp(since))
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al contar llamadas recientes")?;

        let cnt: i64 = row.try_get("cnt")?;
        Ok(cnt.max(0) as u64)
    }

    async fn find_assistant_binding(
        &self,
        assistant_id: &str,
    ) -> Result<Option<AssistantBinding>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, user_id
            FROM orders
            WHERE vapi_assistant_id = ?1
              AND user_id IS NOT NULL
              AND user_id != ''
            ORDER BY created_at ASC, order_id ASC
            LIMIT 1
            "#,
        )
        .bind(assistant_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al buscar order por assistant")?;

        match row {
            Some(r) => Ok(Some(AssistantBinding {
                assistant_id: assistant_id.to_string(),
                user_id: r.try_get("user_id")?,
                order_id: r.try_get("order_id")?,
            })),
            None => Ok(None),
        }
    }

    async fn get_tenant(&self, user_id: &str) -> Result<Option<TenantConfig>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, zone_assignments, monthly_calls, monthly_calls_limit,
                   current_month_start, subscription_plan
            FROM users
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al leer tenant")?;

        let Some(r) = row else {
            return Ok(None);
        };

        let zones_raw: String = r.try_get("zone_assignments")?;
        let zone_assignments =
            serde_json::from_str(&zones_raw).context("zone_assignments no es un JSON válido")?;

        Ok(Some(TenantConfig {
            user_id: r.try_get("user_id")?,
            zone_assignments,
            monthly_calls: r.try_get("monthly_calls")?,
            monthly_calls_limit: r.try_get("monthly_calls_limit")?,
            current_month_start: parse_timestamp(r.try_get("current_month_start")?),
            subscription_plan: r.try_get("subscription_plan")?,
        }))
    }

    async fn reset_monthly_calls(
        &self,
        user_id: &str,
        month_start: DateTime<Utc>,
    ) -> Result<bool> {
        // La condición va en el UPDATE: de dos resets concurrentes sólo uno aplica
        let result = sqlx::query(
            r#"
            UPDATE users
            SET monthly_calls = 1,
                current_month_start = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE user_id = ?1
              AND current_month_start < ?2
            "#,
        )
        .bind(user_id)
        .bind(format_timestamp(month_start))
        .execute(&self.db_pool)
        .await
        .context("Fallo al resetear contador mensual")?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_monthly_calls(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET monthly_calls = monthly_calls + 1
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al incrementar contador mensual")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Tenant {} no encontrado", user_id);
        }
        Ok(())
    }

    async fn create_call(&self, call: &NewCall) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO calls (
                call_id, customer_number, assistant_id, user_id, order_id,
                status, started_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'in_progress', ?6)
            ON CONFLICT(call_id) DO UPDATE SET
                customer_number = CASE WHEN calls.customer_number = ''
                                       THEN excluded.customer_number
                                       ELSE calls.customer_number END,
                assistant_id = COALESCE(calls.assistant_id, excluded.assistant_id),
                user_id = COALESCE(calls.user_id, excluded.user_id),
                order_id = COALESCE(calls.order_id, excluded.order_id),
                started_at = COALESCE(calls.started_at, excluded.started_at)
            "#,
        )
        .bind(&call.call_id)
        .bind(&call.customer_number)
        .bind(&call.assistant_id)
        .bind(&call.user_id)
        .bind(&call.order_id)
        .bind(format_timestamp(call.started_at))
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar llamada")?;

        Ok(())
    }

    async fn complete_call(&self, completion: &CallCompletion) -> Result<()> {
        let structured_data = serde_json::to_string(&completion.structured_data)?;
        let client_info = serde_json::to_string(&completion.client_info)?;

        sqlx::query(
            r#"
            INSERT INTO calls (
                call_id, customer_number, assistant_id, user_id, order_id,
                status, ended_at, duration, ended_reason, transcript,
                structured_data, client_info
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'completed', ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(call_id) DO UPDATE SET
                customer_number = CASE WHEN calls.customer_number = ''
                                       THEN excluded.customer_number
                                       ELSE calls.customer_number END,
                assistant_id = COALESCE(calls.assistant_id, excluded.assistant_id),
                user_id = COALESCE(calls.user_id, excluded.user_id),
                order_id = COALESCE(calls.order_id, excluded.order_id),
                status = 'completed',
                ended_at = COALESCE(calls.ended_at, excluded.ended_at),
                duration = COALESCE(excluded.duration, calls.duration),
                ended_reason = CASE WHEN excluded.ended_reason = ?12
                                         AND calls.ended_reason IS NOT NULL
                                    THEN calls.ended_reason
                                    ELSE excluded.ended_reason END,
                transcript = COALESCE(excluded.transcript, calls.transcript),
                structured_data = json_patch(COALESCE(calls.structured_data, '{}'),
                                             excluded.structured_data),
                client_info = json_patch(COALESCE(calls.client_info, '{}'),
                                         excluded.client_info)
            "#,
        )
        .bind(&completion.call_id)
        .bind(&completion.customer_number)
        .bind(&completion.assistant_id)
        .bind(&completion.user_id)
        .bind(&completion.order_id)
        .bind(format_timestamp(completion.ended_at))
        .bind(completion.duration)
        .bind(&completion.ended_reason)
        .bind(&completion.transcript)
        .bind(structured_data)
        .bind(client_info)
        .bind(UNKNOWN_ENDED_REASON)
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar fin de llamada")?;

        Ok(())
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>> {
        let row = sqlx::query(
            r#"
            SELECT call_id, customer_number, assistant_id, user_id, order_id,
                   status, started_at, ended_at, duration, ended_reason,
                   transcript, structured_data, client_info
            FROM calls
            WHERE call_id = ?1
            "#,
        )
        .bind(call_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al leer llamada")?;

        row.as_ref().map(call_from_row).transpose()
    }

    async fn monthly_usage_since(&self, since: DateTime<Utc>) -> Result<UsageSummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS calls, COALESCE(SUM(duration), 0) AS total_duration
            FROM calls
            WHERE started_at >= ?1
            "#,
        )
        .bind(format_timestamp(since))
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al calcular uso mensual")?;

        let calls: i64 = row.try_get("calls")?;
        Ok(UsageSummary {
            calls: calls.max(0) as u64,
            total_duration_secs: row.try_get("total_duration")?,
        })
    }

    async fn claim_call_event(&self, call_id: &str, claim: CallClaim) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO call_claims (call_id, kind, claimed_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(call_id)
        .bind(claim.as_str())
        .bind(format_timestamp(Utc::now()))
        .execute(&self.db_pool)
        .await
        .with_context(|| format!("Fallo al reservar '{}' de la llamada", claim))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_notification(&self, record: &NotificationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, call_id, recipient, channel, status, error_message, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.call_id)
        .bind(&record.recipient)
        .bind(&record.channel)
        .bind(&record.status)
        .bind(&record.error_message)
        .bind(format_timestamp(record.created_at))
        .execute(&self.db_pool)
        .await
        .context("Error registrando notificación")?;

        Ok(())
    }
}

// ----------------------------------------------------------------
// Helpers para tests: base en memoria y carga de datos
// ----------------------------------------------------------------
#[cfg(test)]
impl SqliteStore {
    /// Una sola conexión: cada conexión `:memory:` es una base distinta.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self::new(db_pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn insert_tenant(&self, tenant: &TenantConfig) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, zone_assignments, monthly_calls, monthly_calls_limit,
                current_month_start, subscription_plan
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&tenant.user_id)
        .bind(serde_json::to_string(&tenant.zone_assignments)?)
        .bind(tenant.monthly_calls)
        .bind(tenant.monthly_calls_limit)
        .bind(tenant.current_month_start.map(format_timestamp))
        .bind(&tenant.subscription_plan)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    pub async fn insert_order(
        &self,
        order_id: &str,
        user_id: Option<&str>,
        assistant_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, vapi_assistant_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(assistant_id)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    pub async fn rebind_order(&self, order_id: &str, user_id: &str) -> Result<()> {
        sqlx::query("UPDATE orders SET user_id = ?1 WHERE order_id = ?2")
            .bind(user_id)
            .bind(order_id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn list_notifications(&self, call_id: &str) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, call_id, recipient, channel, status, error_message, created_at
            FROM notifications
            WHERE call_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(call_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut result = Vec::new();
        for r in rows {
            result.push(NotificationRecord {
                id: r.try_get("id")?,
                call_id: r.try_get("call_id")?,
                recipient: r.try_get("recipient")?,
                channel: r.try_get("channel")?,
                status: r.try_get("status")?,
                error_message: r.try_get("error_message")?,
                created_at: parse_timestamp(r.try_get("created_at")?).unwrap_or_else(Utc::now),
            });
        }
        Ok(result)
    }
}
