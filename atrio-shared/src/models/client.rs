/// Client model and database operations
///
/// This module provides the Client model for agency client records. Clients
/// are the primary capped resource: creating one is an admission-checked
/// mutation against the organization's resolved `max_clients` limit.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE client_status AS ENUM ('active', 'inactive', 'prospect');
///
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(50),
///     company VARCHAR(255),
///     industry VARCHAR(100),
///     contact_person VARCHAR(255),
///     monthly_value_cents BIGINT,
///     status client_status NOT NULL DEFAULT 'active',
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Client lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "client_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// Under active contract
    Active,

    /// Past client
    Inactive,

    /// Not yet signed
    Prospect,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Prospect => "prospect",
        }
    }
}

/// Client model representing an agency client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    /// Unique client ID (UUID v4)
    pub id: Uuid,

    /// Organization this client belongs to
    pub organization_id: Uuid,

    /// Client name
    pub name: String,

    /// Contact email
    pub email: Option<String>,

    /// Contact phone
    pub phone: Option<String>,

    /// Company name
    pub company: Option<String>,

    /// Industry vertical
    pub industry: Option<String>,

    /// Primary contact person
    pub contact_person: Option<String>,

    /// Monthly retainer value in cents
    pub monthly_value_cents: Option<i64>,

    /// Lifecycle status
    pub status: ClientStatus,

    /// Free-form notes
    pub notes: Option<String>,

    /// When the client was created
    pub created_at: DateTime<Utc>,

    /// When the client was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClient {
    /// Organization this client belongs to
    pub organization_id: Uuid,

    /// Client name
    pub name: String,

    /// Contact email
    pub email: Option<String>,

    /// Contact phone
    pub phone: Option<String>,

    /// Company name
    pub company: Option<String>,

    /// Industry vertical
    pub industry: Option<String>,

    /// Primary contact person
    pub contact_person: Option<String>,

    /// Monthly retainer value in cents
    pub monthly_value_cents: Option<i64>,

    /// Free-form notes
    pub notes: Option<String>,
}

/// Input for updating an existing client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub industry: Option<Option<String>>,
    pub contact_person: Option<Option<String>>,
    pub monthly_value_cents: Option<Option<i64>>,
    pub status: Option<ClientStatus>,
    pub notes: Option<Option<String>>,
}

const CLIENT_COLUMNS: &str = "id, organization_id, name, email, phone, company, industry, \
     contact_person, monthly_value_cents, status, notes, created_at, updated_at";

impl Client {
    /// Creates a new client without an admission check
    ///
    /// Prefer [`Client::create_within_limit`] on request paths; this variant
    /// exists for admin tooling and tests.
    pub async fn create(pool: &PgPool, data: CreateClient) -> Result<Self, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (organization_id, name, email, phone, company, industry,
                                 contact_person, monthly_value_cents, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.company)
        .bind(data.industry)
        .bind(data.contact_person)
        .bind(data.monthly_value_cents)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(client)
    }

    /// Creates a client only if the organization is below its client cap
    ///
    /// The admission check and the insert are one conditional statement:
    /// two concurrent requests against an organization sitting one below
    /// its limit cannot both succeed, which a separate
    /// check-then-insert sequence would allow.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - Client creation data
    /// * `max_clients` - Resolved client cap for the organization
    ///
    /// # Returns
    ///
    /// The created client, or None when the organization is at its cap
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use atrio_shared::models::client::{Client, CreateClient};
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, org_id: Uuid) -> Result<(), sqlx::Error> {
    /// let data = CreateClient {
    ///     organization_id: org_id,
    ///     name: "Bistro Central".to_string(),
    ///     email: None, phone: None, company: None, industry: None,
    ///     contact_person: None, monthly_value_cents: None, notes: None,
    /// };
    ///
    /// match Client::create_within_limit(&pool, data, 50).await? {
    ///     Some(client) => println!("Created {}", client.id),
    ///     None => println!("Client cap reached"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_within_limit(
        pool: &PgPool,
        data: CreateClient,
        max_clients: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (organization_id, name, email, phone, company, industry,
                                 contact_person, monthly_value_cents, notes)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE (SELECT COUNT(*) FROM clients WHERE organization_id = $1) < $10
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.company)
        .bind(data.industry)
        .bind(data.contact_person)
        .bind(data.monthly_value_cents)
        .bind(data.notes)
        .bind(max_clients as i64)
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    /// Finds a client by ID with tenant isolation
    pub async fn find_by_id_and_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND organization_id = $2",
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    /// Lists all clients of an organization, newest first
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE organization_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(clients)
    }

    /// Updates an existing client (tenant-scoped)
    ///
    /// # Returns
    ///
    /// The updated client if found within the organization, None otherwise
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        data: UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE clients SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.company.is_some() {
            bind_count += 1;
            query.push_str(&format!(", company = ${}", bind_count));
        }
        if data.industry.is_some() {
            bind_count += 1;
            query.push_str(&format!(", industry = ${}", bind_count));
        }
        if data.contact_person.is_some() {
            bind_count += 1;
            query.push_str(&format!(", contact_person = ${}", bind_count));
        }
        if data.monthly_value_cents.is_some() {
            bind_count += 1;
            query.push_str(&format!(", monthly_value_cents = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND organization_id = $2 RETURNING {CLIENT_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(organization_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(company) = data.company {
            q = q.bind(company);
        }
        if let Some(industry) = data.industry {
            q = q.bind(industry);
        }
        if let Some(contact_person) = data.contact_person {
            q = q.bind(contact_person);
        }
        if let Some(monthly_value_cents) = data.monthly_value_cents {
            q = q.bind(monthly_value_cents);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(notes) = data.notes {
            q = q.bind(notes);
        }

        let client = q.fetch_optional(pool).await?;

        Ok(client)
    }

    /// Deletes a client (tenant-scoped), freeing cap capacity
    ///
    /// # Returns
    ///
    /// True if the client was deleted
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts clients of an organization
    pub async fn count_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Counts clients created in a window (inclusive bounds)
    pub async fn count_created_between(
        pool: &PgPool,
        organization_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM clients
            WHERE organization_id = $1 AND created_at >= $2 AND created_at <= $3
            "#,
        )
        .bind(organization_id)
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
    fn test_client_status_as_str() {
        assert_eq!(ClientStatus::Active.as_str(), "active");
        assert_eq!(ClientStatus::Inactive.as_str(), "inactive");
        assert_eq!(ClientStatus::Prospect.as_str(), "prospect");
    }

    #[test]
    fn test_client_status_serde() {
        let status: ClientStatus = serde_json::from_str("\"prospect\"").unwrap();
        assert_eq!(status, ClientStatus::Prospect);
        assert_eq!(serde_json::to_string(&ClientStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn test_update_client_default() {
        let update = UpdateClient::default();
        assert!(update.name.is_none());
        assert!(update.status.is_none());
        assert!(update.monthly_value_cents.is_none());
    }

    // Integration tests for database operations require a running database
}
