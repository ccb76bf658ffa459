/// Plan model and database operations
///
/// This module provides the Plan model for the subscription tier catalog.
/// Plans define numeric caps (users, clients) and boolean feature flags
/// that the entitlement evaluator reads at request time.
///
/// Plans are created by admin tooling, read-only at request time, and
/// soft-deactivated rather than deleted while organizations reference them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE plans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     price_cents BIGINT NOT NULL DEFAULT 0,
///     features TEXT[] NOT NULL DEFAULT '{}',
///     max_users INTEGER,
///     max_clients INTEGER,
///     has_ai_strategies BOOLEAN NOT NULL DEFAULT FALSE,
///     has_integrations BOOLEAN NOT NULL DEFAULT FALSE,
///     has_advanced_reports BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use atrio_shared::models::plan::{CreatePlan, Plan};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let plan = Plan::create(&pool, CreatePlan {
///     name: "Pro".to_string(),
///     description: Some("For growing agencies".to_string()),
///     price_cents: 9900,
///     features: vec!["priority_support".to_string()],
///     max_users: Some(25),
///     max_clients: Some(500),
///     has_ai_strategies: true,
///     has_integrations: true,
///     has_advanced_reports: true,
/// }).await?;
/// println!("Created plan: {}", plan.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Plan model representing a subscription tier
///
/// Numeric caps are optional: a plan that leaves `max_users` unset lets the
/// entitlement evaluator fall through to the organization override or the
/// hard default for that field.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    /// Unique plan ID (UUID v4)
    pub id: Uuid,

    /// Display name (e.g. "Starter", "Pro")
    pub name: String,

    /// Optional marketing description
    pub description: Option<String>,

    /// Monthly price in cents
    pub price_cents: i64,

    /// Free-form feature flags beyond the three named booleans
    pub features: Vec<String>,

    /// Maximum active users, if the plan caps them
    pub max_users: Option<i32>,

    /// Maximum clients, if the plan caps them
    pub max_clients: Option<i32>,

    /// Whether AI strategy generation is included
    pub has_ai_strategies: bool,

    /// Whether marketing platform integrations are included
    pub has_integrations: bool,

    /// Whether advanced reporting is included
    pub has_advanced_reports: bool,

    /// Whether the plan is offered (soft-deactivation flag)
    pub is_active: bool,

    /// When the plan was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Monthly price in cents
    pub price_cents: i64,

    /// Free-form feature flags
    #[serde(default)]
    pub features: Vec<String>,

    /// Maximum active users
    pub max_users: Option<i32>,

    /// Maximum clients
    pub max_clients: Option<i32>,

    /// AI strategy generation flag
    #[serde(default)]
    pub has_ai_strategies: bool,

    /// Marketing integrations flag
    #[serde(default)]
    pub has_integrations: bool,

    /// Advanced reports flag
    #[serde(default)]
    pub has_advanced_reports: bool,
}

/// Input for updating an existing plan
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    /// New display name
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// New price in cents
    pub price_cents: Option<i64>,

    /// Replace the features list
    pub features: Option<Vec<String>>,

    /// New user cap (use Some(None) to clear)
    pub max_users: Option<Option<i32>>,

    /// New client cap (use Some(None) to clear)
    pub max_clients: Option<Option<i32>>,

    /// New AI strategies flag
    pub has_ai_strategies: Option<bool>,

    /// New integrations flag
    pub has_integrations: Option<bool>,

    /// New advanced reports flag
    pub has_advanced_reports: Option<bool>,
}

const PLAN_COLUMNS: &str = "id, name, description, price_cents, features, max_users, max_clients, \
     has_ai_strategies, has_integrations, has_advanced_reports, is_active, created_at";

impl Plan {
    /// Creates a new plan in the database
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - Plan creation data
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create(pool: &PgPool, data: CreatePlan) -> Result<Self, sqlx::Error> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            INSERT INTO plans (name, description, price_cents, features, max_users, max_clients,
                               has_ai_strategies, has_integrations, has_advanced_reports)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PLAN_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.price_cents)
        .bind(&data.features)
        .bind(data.max_users)
        .bind(data.max_clients)
        .bind(data.has_ai_strategies)
        .bind(data.has_integrations)
        .bind(data.has_advanced_reports)
        .fetch_one(pool)
        .await?;

        Ok(plan)
    }

    /// Finds a plan by ID
    ///
    /// # Returns
    ///
    /// The plan if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    /// Lists plans currently offered, cheapest first
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE is_active = TRUE ORDER BY price_cents ASC",
        ))
        .fetch_all(pool)
        .await?;

        Ok(plans)
    }

    /// Lists all plans including deactivated ones
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY price_cents ASC",
        ))
        .fetch_all(pool)
        .await?;

        Ok(plans)
    }

    /// Updates an existing plan
    ///
    /// Only non-None fields in `data` will be updated.
    ///
    /// # Returns
    ///
    /// The updated plan if found, None if the plan doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePlan,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE plans SET id = id");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.price_cents.is_some() {
            bind_count += 1;
            query.push_str(&format!(", price_cents = ${}", bind_count));
        }
        if data.features.is_some() {
            bind_count += 1;
            query.push_str(&format!(", features = ${}", bind_count));
        }
        if data.max_users.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_users = ${}", bind_count));
        }
        if data.max_clients.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_clients = ${}", bind_count));
        }
        if data.has_ai_strategies.is_some() {
            bind_count += 1;
            query.push_str(&format!(", has_ai_strategies = ${}", bind_count));
        }
        if data.has_integrations.is_some() {
            bind_count += 1;
            query.push_str(&format!(", has_integrations = ${}", bind_count));
        }
        if data.has_advanced_reports.is_some() {
            bind_count += 1;
            query.push_str(&format!(", has_advanced_reports = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {PLAN_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Plan>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(price_cents) = data.price_cents {
            q = q.bind(price_cents);
        }
        if let Some(features) = data.features {
            q = q.bind(features);
        }
        if let Some(max_users) = data.max_users {
            q = q.bind(max_users);
        }
        if let Some(max_clients) = data.max_clients {
            q = q.bind(max_clients);
        }
        if let Some(flag) = data.has_ai_strategies {
            q = q.bind(flag);
        }
        if let Some(flag) = data.has_integrations {
            q = q.bind(flag);
        }
        if let Some(flag) = data.has_advanced_reports {
            q = q.bind(flag);
        }

        let plan = q.fetch_optional(pool).await?;

        Ok(plan)
    }

    /// Soft-deactivates a plan
    ///
    /// The plan stops being offered but remains readable for organizations
    /// that still reference it.
    ///
    /// # Returns
    ///
    /// True if the plan was found and deactivated
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE plans SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_plan_defaults() {
        let json = r#"{"name": "Starter", "description": null, "price_cents": 2900,
                       "max_users": 5, "max_clients": 50}"#;
        let create: CreatePlan = serde_json::from_str(json).unwrap();

        assert_eq!(create.name, "Starter");
        assert_eq!(create.price_cents, 2900);
        assert!(create.features.is_empty());
        assert!(!create.has_ai_strategies);
        assert!(!create.has_integrations);
        assert!(!create.has_advanced_reports);
    }

    #[test]
    fn test_update_plan_default() {
        let update = UpdatePlan::default();
        assert!(update.name.is_none());
        assert!(update.price_cents.is_none());
        assert!(update.features.is_none());
        assert!(update.has_ai_strategies.is_none());
    }

    // Integration tests for database operations require a running database
}
