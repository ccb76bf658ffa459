/// Marketing integration model and database operations
///
/// A marketing integration records a connection between an organization and
/// an ad platform. Integrations are feature-gated (`has_integrations`) and
/// counted by the usage meter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Supported ad platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "integration_platform", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IntegrationPlatform {
    Facebook,
    Google,
    Instagram,
}

impl IntegrationPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationPlatform::Facebook => "facebook",
            IntegrationPlatform::Google => "google",
            IntegrationPlatform::Instagram => "instagram",
        }
    }
}

/// Connection state of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "integration_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
    Error,
}

/// Marketing integration model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketingIntegration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub platform: IntegrationPlatform,
    pub status: IntegrationStatus,

    /// Platform-specific settings (account ids, token references)
    pub settings: JsonValue,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for connecting a new integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntegration {
    pub organization_id: Uuid,
    pub platform: IntegrationPlatform,
    #[serde(default = "default_settings")]
    pub settings: JsonValue,
}

fn default_settings() -> JsonValue {
    serde_json::json!({})
}

impl MarketingIntegration {
    /// Connects a new integration
    pub async fn create(pool: &PgPool, data: CreateIntegration) -> Result<Self, sqlx::Error> {
        let integration = sqlx::query_as::<_, MarketingIntegration>(
            r#"
            INSERT INTO marketing_integrations (organization_id, platform, settings)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, platform, status, settings, created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.platform)
        .bind(data.settings)
        .fetch_one(pool)
        .await?;

        Ok(integration)
    }

    /// Lists integrations of an organization
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let integrations = sqlx::query_as::<_, MarketingIntegration>(
            r#"
            SELECT id, organization_id, platform, status, settings, created_at, updated_at
            FROM marketing_integrations
            WHERE organization_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(integrations)
    }

    /// Counts integrations of an organization
    pub async fn count_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM marketing_integrations WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates the connection state
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        status: IntegrationStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE marketing_integrations
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Disconnects and removes an integration (tenant-scoped)
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM marketing_integrations WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_as_str() {
        assert_eq!(IntegrationPlatform::Facebook.as_str(), "facebook");
        assert_eq!(IntegrationPlatform::Google.as_str(), "google");
        assert_eq!(IntegrationPlatform::Instagram.as_str(), "instagram");
    }

    #[test]
    fn test_platform_serde() {
        let platform: IntegrationPlatform = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(platform, IntegrationPlatform::Google);
    }
}
