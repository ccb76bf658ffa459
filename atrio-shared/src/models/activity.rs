/// Activity log model and database operations
///
/// Activities form an append-only log of notable tenant events
/// (`strategy_generated`, `payment_received`, `task_completed`, ...).
/// Besides powering the dashboard feed, the log is the source of truth for
/// metered usage: AI strategy generations in a billing window are counted
/// here, recomputed on every evaluation rather than cached.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     kind VARCHAR(50) NOT NULL,
///     description TEXT NOT NULL,
///     user_id UUID REFERENCES users(id),
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Activity kind recorded when an AI strategy is generated. Counted by the
/// usage meter.
pub const KIND_STRATEGY_GENERATED: &str = "strategy_generated";

/// Activity model representing one logged event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Unique activity ID
    pub id: Uuid,

    /// Organization the event belongs to
    pub organization_id: Uuid,

    /// Event kind (e.g. "strategy_generated")
    pub kind: String,

    /// Human-readable description
    pub description: String,

    /// Acting user, if any
    pub user_id: Option<Uuid>,

    /// Related client, if any
    pub client_id: Option<Uuid>,

    /// Kind-specific payload
    pub metadata: JsonValue,

    /// When the event happened
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActivity {
    pub organization_id: Uuid,
    pub kind: String,
    pub description: String,
    pub user_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    #[serde(default = "default_metadata")]
    pub metadata: JsonValue,
}

fn default_metadata() -> JsonValue {
    serde_json::json!({})
}

impl Activity {
    /// Appends an activity to the log
    pub async fn record(pool: &PgPool, data: RecordActivity) -> Result<Self, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (organization_id, kind, description, user_id, client_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, kind, description, user_id, client_id, metadata, created_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.kind)
        .bind(data.description)
        .bind(data.user_id)
        .bind(data.client_id)
        .bind(data.metadata)
        .fetch_one(pool)
        .await?;

        Ok(activity)
    }

    /// Lists the most recent activities of an organization
    pub async fn list_recent(
        pool: &PgPool,
        organization_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, organization_id, kind, description, user_id, client_id, metadata, created_at
            FROM activities
            WHERE organization_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(organization_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(activities)
    }

    /// Counts activities of a kind within a window (inclusive bounds)
    ///
    /// This is the metering query behind "AI strategy generations in the
    /// current period" — recomputed on every call, no cached counter.
    pub async fn count_by_kind_between(
        pool: &PgPool,
        organization_id: Uuid,
        kind: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM activities
            WHERE organization_id = $1
              AND kind = $2
              AND created_at >= $3
              AND created_at <= $4
            "#,
        )
        .bind(organization_id)
        .bind(kind)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_activity_default_metadata() {
        let json = r#"{"organization_id": "f3b7b2c0-0000-0000-0000-000000000000",
                       "kind": "task_completed", "description": "Task done",
                       "user_id": null, "client_id": null}"#;
        let record: RecordActivity = serde_json::from_str(json).unwrap();
        assert_eq!(record.metadata, serde_json::json!({}));
    }

    // Integration tests for database operations require a running database
}
