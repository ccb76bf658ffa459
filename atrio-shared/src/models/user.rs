/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user
/// accounts. Every non-owner user belongs to exactly one organization; the
/// owner is the creator of the organization and implicitly holds every
/// capability regardless of the role table.
///
/// Roles form a closed enum mapped to a fixed capability set, evaluated via
/// a lookup table instead of string matching.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('owner', 'admin', 'user');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'user',
///     organization_id UUID REFERENCES organizations(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use atrio_shared::models::user::{CreateUser, User, UserRole};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "owner@acme.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Ana".to_string()),
///     role: UserRole::Owner,
///     organization_id: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "owner@acme.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Closed set of tenant roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Organization creator: full control including billing
    Owner,

    /// Can manage clients, tasks, financial records, and the team
    Admin,

    /// Day-to-day member: works on tasks, reads most data
    User,
}

/// Closed set of actions gated by role
///
/// Adding a variant here forces every role mapping below to be revisited,
/// which is the point: the permission table is checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewClients,
    CreateClients,
    UpdateClients,
    DeleteClients,
    CreateTasks,
    UpdateTasks,
    DeleteTasks,
    ViewFinancial,
    CreateFinancial,
    UpdateFinancial,
    ViewReports,
    ManageTeam,
    ManageBilling,
}

impl UserRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    /// Checks whether this role may perform an action
    ///
    /// Owners pass every check. The remaining roles use a fixed lookup
    /// table, exhaustive over [`Action`].
    pub fn allows(&self, action: Action) -> bool {
        match self {
            UserRole::Owner => true,
            UserRole::Admin => match action {
                Action::ViewClients
                | Action::CreateClients
                | Action::UpdateClients
                | Action::DeleteClients
                | Action::CreateTasks
                | Action::UpdateTasks
                | Action::DeleteTasks
                | Action::ViewFinancial
                | Action::CreateFinancial
                | Action::UpdateFinancial
                | Action::ViewReports
                | Action::ManageTeam => true,
                Action::ManageBilling => false,
            },
            UserRole::User => match action {
                Action::ViewClients
                | Action::CreateTasks
                | Action::UpdateTasks
                | Action::ViewFinancial
                | Action::ViewReports => true,
                Action::CreateClients
                | Action::UpdateClients
                | Action::DeleteClients
                | Action::DeleteTasks
                | Action::CreateFinancial
                | Action::UpdateFinancial
                | Action::ManageTeam
                | Action::ManageBilling => false,
            },
        }
    }
}

/// User model representing a tenant member
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT, globally unique)
    pub email: String,

    /// Argon2id password hash
    ///
    /// Never store plaintext passwords
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Role within the organization
    pub role: UserRole,

    /// Organization the user belongs to
    pub organization_id: Option<Uuid>,

    /// Whether the account is active (inactive users don't count against caps)
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (stored case-insensitively)
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Role to assign
    pub role: UserRole,

    /// Organization to attach to
    pub organization_id: Option<Uuid>,
}

/// Input for updating an existing user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New display name (use Some(None) to clear)
    pub name: Option<Option<String>>,

    /// New role
    pub role: Option<UserRole>,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, organization_id, is_active, \
     created_at, updated_at, last_login_at";

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, organization_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.role)
        .bind(data.organization_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Creates a user only if the organization is below its user cap
    ///
    /// The cap check and the insert happen in one conditional statement so
    /// two simultaneous invitations cannot both land an organization over
    /// its limit the way a separate read-then-write would.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - User creation data (must carry an organization_id)
    /// * `max_users` - Resolved user cap for the organization
    ///
    /// # Returns
    ///
    /// The created user, or None when the organization is at its cap
    pub async fn create_within_limit(
        pool: &PgPool,
        data: CreateUser,
        max_users: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, organization_id)
            SELECT $1, $2, $3, $4, $5
            WHERE (
                SELECT COUNT(*) FROM users
                WHERE organization_id = $5 AND is_active = TRUE
            ) < $6
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.role)
        .bind(data.organization_id)
        .bind(max_users as i64)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the new email already exists for another user
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name_opt) = data.name {
            q = q.bind(name_opt);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Updates the last login timestamp, typically after authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deactivates a user account
    ///
    /// Deactivated users stop counting against the organization's user cap.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists members of an organization, oldest first
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE organization_id = $1
            ORDER BY created_at ASC
            "#,
        ))
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts active members of an organization
    pub async fn count_active_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE organization_id = $1 AND is_active = TRUE",
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::Owner.as_str(), "owner");
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::User.as_str(), "user");
    }

    #[test]
    fn test_owner_allows_everything() {
        for action in [
            Action::ViewClients,
            Action::CreateClients,
            Action::DeleteClients,
            Action::CreateFinancial,
            Action::ManageTeam,
            Action::ManageBilling,
        ] {
            assert!(UserRole::Owner.allows(action));
        }
    }

    #[test]
    fn test_admin_permissions() {
        assert!(UserRole::Admin.allows(Action::CreateClients));
        assert!(UserRole::Admin.allows(Action::DeleteTasks));
        assert!(UserRole::Admin.allows(Action::ManageTeam));
        assert!(!UserRole::Admin.allows(Action::ManageBilling));
    }

    #[test]
    fn test_user_permissions() {
        assert!(UserRole::User.allows(Action::ViewClients));
        assert!(UserRole::User.allows(Action::CreateTasks));
        assert!(UserRole::User.allows(Action::ViewReports));
        assert!(!UserRole::User.allows(Action::CreateClients));
        assert!(!UserRole::User.allows(Action::ManageTeam));
        assert!(!UserRole::User.allows(Action::ManageBilling));
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
        assert!(update.name.is_none());
        assert!(update.role.is_none());
    }

    // Integration tests for database operations require a running database
}
