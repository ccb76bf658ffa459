/// Financial record endpoints (tenant-scoped)
///
/// Write access follows the capability table: members can read, admins and
/// owners can create, update, and delete.
///
/// # Endpoints
///
/// - `GET    /v1/financial` - List records
/// - `POST   /v1/financial` - Create a record
/// - `POST   /v1/financial/:id/pay` - Mark a record paid
/// - `DELETE /v1/financial/:id` - Delete a record

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use atrio_shared::auth::middleware::{AuthContext, OrgContext};
use atrio_shared::models::financial::{CreateFinancialRecord, FinancialRecord, RecordKind};
use atrio_shared::models::user::{Action, User};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Create-record request body
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub client_id: Option<Uuid>,
    pub kind: RecordKind,
    pub amount_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
}

/// Mark-paid request body
#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    /// Payment date; defaults to today
    pub paid_date: Option<NaiveDate>,
}

async fn require_action(state: &AppState, auth: &AuthContext, action: Action) -> Result<(), ApiError> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !user.role.allows(action) {
        return Err(ApiError::Forbidden(
            "Not allowed to modify financial records".to_string(),
        ));
    }

    Ok(())
}

/// Lists financial records of the organization
pub async fn list_records(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<FinancialRecord>>> {
    let records = FinancialRecord::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(records))
}

/// Creates a financial record
pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<FinancialRecord>)> {
    require_action(&state, &auth, Action::CreateFinancial).await?;

    if req.amount_cents <= 0 {
        return Err(ApiError::BadRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let record = FinancialRecord::create(
        &state.db,
        CreateFinancialRecord {
            organization_id,
            client_id: req.client_id,
            kind: req.kind,
            amount_cents: req.amount_cents,
            due_date: req.due_date,
            description: req.description,
            invoice_number: req.invoice_number,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Marks a record as paid
pub async fn mark_record_paid(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkPaidRequest>,
) -> ApiResult<Json<FinancialRecord>> {
    require_action(&state, &auth, Action::UpdateFinancial).await?;

    let paid_date = req.paid_date.unwrap_or_else(|| Utc::now().date_naive());

    let record = FinancialRecord::mark_paid(&state.db, id, organization_id, paid_date)
        .await?
        .ok_or_else(|| ApiError::NotFound("Financial record not found".to_string()))?;

    Ok(Json(record))
}

/// Deletes a financial record
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_action(&state, &auth, Action::UpdateFinancial).await?;

    let deleted = FinancialRecord::delete(&state.db, id, organization_id).await?;

    if !deleted {
        return Err(ApiError::NotFound(
            "Financial record not found".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
