/// On-demand usage counters for tenant consumption
///
/// Every function here is a plain filtered count over the underlying table,
/// scoped by tenant and, where applicable, a time window with inclusive
/// bounds. Nothing is cached and no incremental counters exist: each call
/// recomputes from the source of truth at read-committed isolation. Callers
/// that need a race-free admission decision must use the conditional-insert
/// paths on the models instead of pairing these reads with a write.

use crate::models::activity::{self, Activity};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Counts active users of an organization
pub async fn count_active_users(pool: &PgPool, organization_id: Uuid) -> Result<i64, sqlx::Error> {
    crate::models::user::User::count_active_by_organization(pool, organization_id).await
}

/// Counts clients of an organization
pub async fn count_clients(pool: &PgPool, organization_id: Uuid) -> Result<i64, sqlx::Error> {
    crate::models::client::Client::count_by_organization(pool, organization_id).await
}

/// Counts marketing integrations of an organization
pub async fn count_integrations(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<i64, sqlx::Error> {
    crate::models::integration::MarketingIntegration::count_by_organization(pool, organization_id)
        .await
}

/// Counts AI strategy generations within a window (inclusive bounds)
pub async fn count_ai_generations_between(
    pool: &PgPool,
    organization_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    Activity::count_by_kind_between(
        pool,
        organization_id,
        activity::KIND_STRATEGY_GENERATED,
        start,
        end,
    )
    .await
}
