/// Organization endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations/current` - The principal's organization, plan,
///   and resolved limits

use crate::{app::AppState, error::{ApiError, ApiResult}};
use atrio_shared::auth::middleware::AuthContext;
use atrio_shared::entitlements::EntitlementSnapshot;
use atrio_shared::models::{
    organization::{Organization, UpdateOrganization},
    plan::Plan,
    user::{Action, User},
};
use atrio_shared::usage;
use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

/// Current consumption against the resolved limits
#[derive(Debug, Serialize)]
pub struct UsageSnapshot {
    /// Active users right now
    pub users: i64,

    /// Clients right now
    pub clients: i64,

    /// Whether another user would be admitted
    pub can_add_user: bool,

    /// Whether another client would be admitted
    pub can_add_client: bool,
}

/// Response for the current-organization endpoint
#[derive(Debug, Serialize)]
pub struct CurrentOrganizationResponse {
    /// The authenticated user
    pub user: User,

    /// The user's organization
    pub organization: Organization,

    /// The organization's plan, if one is assigned
    pub plan: Option<Plan>,

    /// Resolved effective limits
    pub limits: EntitlementSnapshot,

    /// Current consumption
    pub usage: UsageSnapshot,
}

async fn resolve_principal(state: &AppState, auth: &AuthContext) -> Result<(User, Uuid), ApiError> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    let organization_id = user
        .organization_id
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok((user, organization_id))
}

/// Returns the principal's organization with plan, limits, and usage
///
/// # Errors
///
/// - `401` when the principal no longer exists
/// - `404` when the user has no organization or it was removed
pub async fn current_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CurrentOrganizationResponse>> {
    let (user, organization_id) = resolve_principal(&state, &auth).await?;

    let organization = Organization::find_by_id(&state.db, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    let plan = match organization.plan_id {
        Some(plan_id) => Plan::find_by_id(&state.db, plan_id).await?,
        None => None,
    };

    let limits = EntitlementSnapshot::resolve(plan.as_ref(), &organization);

    let entitlements = state.entitlements();
    let users = usage::count_active_users(&state.db, organization_id).await?;
    let clients = usage::count_clients(&state.db, organization_id).await?;
    let can_add_user = entitlements.can_add_user(organization_id).await?;
    let can_add_client = entitlements.can_add_client(organization_id).await?;

    Ok(Json(CurrentOrganizationResponse {
        user,
        organization,
        plan,
        limits,
        usage: UsageSnapshot {
            users,
            clients,
            can_add_user,
            can_add_client,
        },
    }))
}

/// Updates the principal's organization (name, override caps, settings)
///
/// Settings are merged, not replaced; the subdomain is immutable.
///
/// # Errors
///
/// - `403` when the requester lacks the manage-team capability
pub async fn update_current_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(data): Json<UpdateOrganization>,
) -> ApiResult<Json<Organization>> {
    let (user, organization_id) = resolve_principal(&state, &auth).await?;

    if !user.role.allows(Action::ManageTeam) {
        return Err(ApiError::Forbidden(
            "Not allowed to update the organization".to_string(),
        ));
    }

    let organization = Organization::update(&state.db, organization_id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(organization))
}
