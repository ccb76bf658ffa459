/// Organization model and database operations
///
/// This module provides the Organization model for multi-tenant isolation.
/// Every client, task, and financial record is scoped to one organization.
///
/// An organization optionally references a Plan; when it does not, the
/// per-organization override caps (`max_users`, `max_clients`) apply, and
/// failing those, hard defaults. Subdomains are globally unique and
/// immutable after creation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     subdomain VARCHAR(100) NOT NULL UNIQUE,
///     plan_id UUID REFERENCES plans(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     max_users INTEGER,
///     max_clients INTEGER,
///     settings JSONB NOT NULL DEFAULT '{}',
///     stripe_customer_id VARCHAR(255),
///     stripe_subscription_id VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use atrio_shared::models::organization::{CreateOrganization, Organization};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let org = Organization::create(&pool, CreateOrganization {
///     name: "Acme Digital".to_string(),
///     subdomain: "acme".to_string(),
///     plan_id: None,
/// }).await?;
///
/// // Assign a plan later (e.g. after checkout)
/// // Organization::update_plan(&pool, org.id, Some(plan_id)).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Organization model representing a tenant account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID (UUID v4)
    pub id: Uuid,

    /// Agency name
    pub name: String,

    /// Globally unique subdomain, immutable after creation
    pub subdomain: String,

    /// Assigned plan, if any
    pub plan_id: Option<Uuid>,

    /// Soft-deactivation flag; set to false on cancellation, the row is
    /// never physically removed while historical records reference it
    pub is_active: bool,

    /// Override user cap, consulted only when the plan leaves it unset
    pub max_users: Option<i32>,

    /// Override client cap, consulted only when the plan leaves it unset
    pub max_clients: Option<i32>,

    /// Tenant-specific configuration (JSONB)
    pub settings: JsonValue,

    /// Payment-processor customer reference (if billing enabled)
    pub stripe_customer_id: Option<String>,

    /// Payment-processor subscription reference (if billing enabled)
    pub stripe_subscription_id: Option<String>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    /// Agency name
    pub name: String,

    /// Desired subdomain (must be globally unique)
    pub subdomain: String,

    /// Initial plan assignment, if any
    pub plan_id: Option<Uuid>,
}

/// Input for updating an existing organization
///
/// The subdomain is deliberately absent: it is immutable after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganization {
    /// New name
    pub name: Option<String>,

    /// New override user cap (use Some(None) to clear)
    pub max_users: Option<Option<i32>>,

    /// New override client cap (use Some(None) to clear)
    pub max_clients: Option<Option<i32>>,

    /// Settings patch (merged with existing settings, not replaced)
    pub settings: Option<JsonValue>,
}

const ORG_COLUMNS: &str = "id, name, subdomain, plan_id, is_active, max_users, max_clients, \
     settings, stripe_customer_id, stripe_subscription_id, created_at, updated_at";

impl Organization {
    /// Creates a new organization
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The subdomain is already taken (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateOrganization) -> Result<Self, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            r#"
            INSERT INTO organizations (name, subdomain, plan_id)
            VALUES ($1, $2, $3)
            RETURNING {ORG_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.subdomain)
        .bind(data.plan_id)
        .fetch_one(pool)
        .await?;

        Ok(organization)
    }

    /// Finds an organization by ID
    ///
    /// # Returns
    ///
    /// The organization if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Finds an organization by subdomain
    pub async fn find_by_subdomain(
        pool: &PgPool,
        subdomain: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE subdomain = $1",
        ))
        .bind(subdomain)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Updates an existing organization
    ///
    /// Only non-None fields in `data` will be updated. Settings are merged
    /// with existing settings (not replaced).
    ///
    /// # Returns
    ///
    /// The updated organization if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE organizations SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.max_users.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_users = ${}", bind_count));
        }
        if data.max_clients.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_clients = ${}", bind_count));
        }
        if data.settings.is_some() {
            bind_count += 1;
            // Merge settings with existing (jsonb || operator)
            query.push_str(&format!(", settings = settings || ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ORG_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Organization>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(max_users) = data.max_users {
            q = q.bind(max_users);
        }
        if let Some(max_clients) = data.max_clients {
            q = q.bind(max_clients);
        }
        if let Some(settings) = data.settings {
            q = q.bind(settings);
        }

        let organization = q.fetch_optional(pool).await?;

        Ok(organization)
    }

    /// Reassigns the organization's plan
    ///
    /// This is the common operation behind upgrades, downgrades, and
    /// cancellations (pass None to drop back to override caps).
    ///
    /// # Returns
    ///
    /// The updated organization if found, None if it doesn't exist
    pub async fn update_plan(
        pool: &PgPool,
        id: Uuid,
        plan_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            r#"
            UPDATE organizations
            SET plan_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORG_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(plan_id)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Stores payment-processor references after a subscription is created
    pub async fn set_billing_refs(
        pool: &PgPool,
        id: Uuid,
        customer_id: &str,
        subscription_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET stripe_customer_id = $2, stripe_subscription_id = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .bind(subscription_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deactivates an organization
    ///
    /// The row is kept so historical financial and task records remain
    /// resolvable.
    ///
    /// # Returns
    ///
    /// True if the organization was found and deactivated
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE organizations SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds an organization by its payment-processor subscription reference
    ///
    /// Used by webhook processing to map processor events back to a tenant.
    pub async fn find_by_stripe_subscription(
        pool: &PgPool,
        subscription_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE stripe_subscription_id = $1",
        ))
        .bind(subscription_id)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_organization_default() {
        let update = UpdateOrganization::default();
        assert!(update.name.is_none());
        assert!(update.max_users.is_none());
        assert!(update.max_clients.is_none());
        assert!(update.settings.is_none());
    }

    #[test]
    fn test_create_organization_deserialize() {
        let json = r#"{"name": "Acme Digital", "subdomain": "acme", "plan_id": null}"#;
        let create: CreateOrganization = serde_json::from_str(json).unwrap();

        assert_eq!(create.name, "Acme Digital");
        assert_eq!(create.subdomain, "acme");
        assert!(create.plan_id.is_none());
    }

    // Integration tests for database operations require a running database
}
