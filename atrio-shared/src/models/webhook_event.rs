/// Webhook event model and database operations
///
/// This is the durable inbox for payment-processor callbacks. The raw event
/// is persisted *before* any local entitlement change is applied, so a crash
/// between receipt and processing leaves a `received` row that the replay
/// loop picks up instead of silently losing the update.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE webhook_provider AS ENUM ('stripe', 'pagseguro');
/// CREATE TYPE webhook_status AS ENUM ('received', 'processed', 'failed');
///
/// CREATE TABLE webhook_events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     provider webhook_provider NOT NULL,
///     event_type VARCHAR(100) NOT NULL,
///     payload JSONB NOT NULL,
///     status webhook_status NOT NULL DEFAULT 'received',
///     error TEXT,
///     received_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     processed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use atrio_shared::models::webhook_event::{WebhookEvent, WebhookProvider};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let event = WebhookEvent::record(
///     &pool,
///     WebhookProvider::Stripe,
///     "customer.subscription.updated",
///     serde_json::json!({"id": "evt_123"}),
/// ).await?;
///
/// // ... apply the event, then:
/// WebhookEvent::mark_processed(&pool, event.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Payment processor that delivered the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookProvider {
    Stripe,
    Pagseguro,
}

impl WebhookProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookProvider::Stripe => "stripe",
            WebhookProvider::Pagseguro => "pagseguro",
        }
    }
}

/// Processing state of a stored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    /// Persisted, not yet applied
    Received,

    /// Applied successfully
    Processed,

    /// Application failed; error holds the reason, replay will retry
    Failed,
}

/// Stored webhook event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub provider: WebhookProvider,
    pub event_type: String,
    pub payload: JsonValue,
    pub status: WebhookStatus,
    pub error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

const EVENT_COLUMNS: &str =
    "id, provider, event_type, payload, status, error, received_at, processed_at";

impl WebhookEvent {
    /// Persists a freshly received event
    ///
    /// Called before any local state is touched.
    pub async fn record(
        pool: &PgPool,
        provider: WebhookProvider,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        let event = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"
            INSERT INTO webhook_events (provider, event_type, payload)
            VALUES ($1, $2, $3)
            RETURNING {EVENT_COLUMNS}
            "#,
        ))
        .bind(provider)
        .bind(event_type)
        .bind(payload)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    /// Marks an event as applied
    pub async fn mark_processed(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processed', error = NULL, processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks an event as failed, keeping it eligible for replay
    pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'failed', error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists events that still need applying, oldest first
    ///
    /// Both `received` (never attempted) and `failed` (previous attempt
    /// errored) rows are returned so the replay loop retries them.
    pub async fn list_unprocessed(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM webhook_events
            WHERE status IN ('received', 'failed')
            ORDER BY received_at ASC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_as_str() {
        assert_eq!(WebhookProvider::Stripe.as_str(), "stripe");
        assert_eq!(WebhookProvider::Pagseguro.as_str(), "pagseguro");
    }

    #[test]
    fn test_status_serde() {
        let status: WebhookStatus = serde_json::from_str("\"received\"").unwrap();
        assert_eq!(status, WebhookStatus::Received);
    }

    // Integration tests for database operations require a running database
}
