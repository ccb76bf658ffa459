/// AI strategy model and database operations
///
/// Stores strategies produced by the completion API. The stored `content`
/// is the raw generated JSON document; clients render it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// AI strategy model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiStrategy {
    /// Unique strategy ID
    pub id: Uuid,

    /// Organization the strategy belongs to
    pub organization_id: Uuid,

    /// Client the strategy was generated for
    pub client_id: Uuid,

    /// Strategy title (taken from the generated document)
    pub title: String,

    /// Generated strategy document (JSON text)
    pub content: String,

    /// Strategy kind (e.g. "marketing_strategy")
    pub kind: String,

    /// Stated objective, if any
    pub objective: Option<String>,

    /// When the strategy was generated
    pub created_at: DateTime<Utc>,
}

/// Input for storing a generated strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAiStrategy {
    pub organization_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub objective: Option<String>,
}

impl AiStrategy {
    /// Stores a generated strategy
    pub async fn create(pool: &PgPool, data: CreateAiStrategy) -> Result<Self, sqlx::Error> {
        let strategy = sqlx::query_as::<_, AiStrategy>(
            r#"
            INSERT INTO ai_strategies (organization_id, client_id, title, content, kind, objective)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, client_id, title, content, kind, objective, created_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.client_id)
        .bind(data.title)
        .bind(data.content)
        .bind(data.kind)
        .bind(data.objective)
        .fetch_one(pool)
        .await?;

        Ok(strategy)
    }

    /// Finds a strategy by ID with tenant isolation
    pub async fn find_by_id_and_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let strategy = sqlx::query_as::<_, AiStrategy>(
            r#"
            SELECT id, organization_id, client_id, title, content, kind, objective, created_at
            FROM ai_strategies
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(strategy)
    }

    /// Lists strategies of an organization, newest first
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let strategies = sqlx::query_as::<_, AiStrategy>(
            r#"
            SELECT id, organization_id, client_id, title, content, kind, objective, created_at
            FROM ai_strategies
            WHERE organization_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(strategies)
    }

    /// Deletes a strategy (tenant-scoped)
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM ai_strategies WHERE id = $1 AND organization_id = $2")
                .bind(id)
                .bind(organization_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
