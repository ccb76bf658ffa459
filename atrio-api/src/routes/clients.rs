/// Client endpoints (tenant-scoped)
///
/// All handlers run behind the organization-access gate and read the
/// resolved tenant from [`OrgContext`]. Creation is admission-checked
/// against the organization's resolved client cap: the cap comparison and
/// the insert happen in one conditional statement, so concurrent requests
/// cannot overshoot the limit.
///
/// # Endpoints
///
/// - `GET    /v1/clients` - List clients
/// - `POST   /v1/clients` - Create (403 + `upgrade: true` at cap)
/// - `GET    /v1/clients/:id` - Fetch one
/// - `PUT    /v1/clients/:id` - Update
/// - `DELETE /v1/clients/:id` - Delete (frees cap capacity)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use atrio_shared::auth::middleware::OrgContext;
use atrio_shared::models::client::{Client, CreateClient, UpdateClient};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Create-client request body
///
/// The tenant comes from the gate, not the body; an `organizationId`
/// field in the body is only used for tenant resolution.
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub contact_person: Option<String>,
    pub monthly_value_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Lists all clients of the organization
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<Client>>> {
    let clients = Client::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(clients))
}

/// Creates a client, enforcing the plan's client cap
///
/// # Errors
///
/// - `403` with `upgrade: true` when the organization is at its cap
pub async fn create_client(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Client name is required".to_string()));
    }

    let limits = state.entitlements().resolve_limits(organization_id).await?;

    let created = Client::create_within_limit(
        &state.db,
        CreateClient {
            organization_id,
            name: req.name,
            email: req.email,
            phone: req.phone,
            company: req.company,
            industry: req.industry,
            contact_person: req.contact_person,
            monthly_value_cents: req.monthly_value_cents,
            notes: req.notes,
        },
        limits.max_clients,
    )
    .await?;

    match created {
        Some(client) => Ok((StatusCode::CREATED, Json(client))),
        None => Err(ApiError::UpgradeRequired(
            "Client limit reached for your plan".to_string(),
        )),
    }
}

/// Fetches a single client
pub async fn get_client(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    let client = Client::find_by_id_and_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    Ok(Json(client))
}

/// Updates a client
pub async fn update_client(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateClient>,
) -> ApiResult<Json<Client>> {
    let client = Client::update(&state.db, id, organization_id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    Ok(Json(client))
}

/// Deletes a client
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = Client::delete(&state.db, id, organization_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
