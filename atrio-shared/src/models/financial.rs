/// Financial record model and database operations
///
/// Financial records back both the revenue analytics and the dashboard
/// figures. Amounts are integer cents.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE record_kind AS ENUM ('invoice', 'payment', 'contract');
/// CREATE TYPE record_status AS ENUM ('pending', 'paid', 'overdue', 'cancelled');
///
/// CREATE TABLE financial_records (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     kind record_kind NOT NULL,
///     amount_cents BIGINT NOT NULL,
///     due_date DATE,
///     paid_date DATE,
///     status record_status NOT NULL DEFAULT 'pending',
///     description TEXT,
///     invoice_number VARCHAR(50),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of financial record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Invoice,
    Payment,
    Contract,
}

/// Payment status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

/// Financial record model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub client_id: Option<Uuid>,
    pub kind: RecordKind,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new financial record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFinancialRecord {
    pub organization_id: Uuid,
    pub client_id: Option<Uuid>,
    pub kind: RecordKind,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
}

const RECORD_COLUMNS: &str = "id, organization_id, client_id, kind, amount_cents, due_date, \
     paid_date, status, description, invoice_number, created_at, updated_at";

impl FinancialRecord {
    /// Creates a new financial record (status starts as pending)
    pub async fn create(pool: &PgPool, data: CreateFinancialRecord) -> Result<Self, sqlx::Error> {
        let record = sqlx::query_as::<_, FinancialRecord>(&format!(
            r#"
            INSERT INTO financial_records (organization_id, client_id, kind, amount_cents,
                                           due_date, description, invoice_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {RECORD_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.client_id)
        .bind(data.kind)
        .bind(data.amount_cents)
        .bind(data.due_date)
        .bind(data.description)
        .bind(data.invoice_number)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Lists records of an organization, newest first
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let records = sqlx::query_as::<_, FinancialRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM financial_records
            WHERE organization_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Marks a record paid as of the given date
    pub async fn mark_paid(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        paid_date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, FinancialRecord>(&format!(
            r#"
            UPDATE financial_records
            SET status = 'paid', paid_date = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {RECORD_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .bind(paid_date)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Deletes a record (tenant-scoped)
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM financial_records WHERE id = $1 AND organization_id = $2")
                .bind(id)
                .bind(organization_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sums paid revenue within a date window (inclusive bounds)
    pub async fn revenue_between(
        pool: &PgPool,
        organization_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM financial_records
            WHERE organization_id = $1
              AND status = 'paid'
              AND paid_date >= $2
              AND paid_date <= $3
            "#,
        )
        .bind(organization_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Counts overdue records
    pub async fn count_overdue(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM financial_records
            WHERE organization_id = $1 AND status = 'overdue'
            "#,
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
    fn test_record_kind_serde() {
        let kind: RecordKind = serde_json::from_str("\"invoice\"").unwrap();
        assert_eq!(kind, RecordKind::Invoice);
        assert_eq!(serde_json::to_string(&RecordKind::Payment).unwrap(), "\"payment\"");
    }

    #[test]
    fn test_record_status_serde() {
        let status: RecordStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, RecordStatus::Cancelled);
    }

    // Integration tests for database operations require a running database
}
