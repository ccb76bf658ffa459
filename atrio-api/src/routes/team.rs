/// Team endpoints (tenant-scoped)
///
/// Inviting a member is the user-cap admission path: the cap check and the
/// insert run as one conditional statement, mirroring client creation.
/// Team mutations require the manage-team capability (owners and admins).
///
/// # Endpoints
///
/// - `GET    /v1/team` - List members
/// - `POST   /v1/team` - Invite a member (403 + `upgrade: true` at cap)
/// - `PUT    /v1/team/:id` - Change a member's role
/// - `DELETE /v1/team/:id` - Deactivate a member

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use atrio_shared::auth::middleware::{AuthContext, OrgContext};
use atrio_shared::auth::password;
use atrio_shared::models::user::{Action, CreateUser, User, UserRole};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Invite-member request body
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Initial password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Role to assign (owner cannot be assigned here)
    pub role: UserRole,
}

async fn require_team_management(state: &AppState, auth: &AuthContext) -> Result<(), ApiError> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !user.role.allows(Action::ManageTeam) {
        return Err(ApiError::Forbidden(
            "Not allowed to manage the team".to_string(),
        ));
    }

    Ok(())
}

/// Lists members of the organization
pub async fn list_members(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<User>>> {
    let members = User::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(members))
}

/// Invites a member, enforcing the plan's user cap
///
/// # Errors
///
/// - `403` when the requester lacks the manage-team capability
/// - `403` with `upgrade: true` when the organization is at its user cap
/// - `409` when the email already exists
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    require_team_management(&state, &auth).await?;

    req.validate().map_err(|e| {
        let errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    })?;

    if req.role == UserRole::Owner {
        return Err(ApiError::BadRequest(
            "The owner role cannot be assigned".to_string(),
        ));
    }

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;
    let limits = state.entitlements().resolve_limits(organization_id).await?;

    let created = User::create_within_limit(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            role: req.role,
            organization_id: Some(organization_id),
        },
        limits.max_users,
    )
    .await?;

    match created {
        Some(user) => Ok((StatusCode::CREATED, Json(user))),
        None => Err(ApiError::UpgradeRequired(
            "User limit reached for your plan".to_string(),
        )),
    }
}

/// Change-role request body
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// New role (owner cannot be assigned)
    pub role: UserRole,
}

/// Changes a member's role
///
/// The owner role can neither be assigned nor taken away here.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<User>> {
    require_team_management(&state, &auth).await?;

    if req.role == UserRole::Owner {
        return Err(ApiError::BadRequest(
            "The owner role cannot be assigned".to_string(),
        ));
    }

    let member = User::find_by_id(&state.db, id)
        .await?
        .filter(|u| u.organization_id == Some(organization_id))
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    if member.role == UserRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner's role cannot be changed".to_string(),
        ));
    }

    let updated = User::update(
        &state.db,
        member.id,
        atrio_shared::models::user::UpdateUser {
            role: Some(req.role),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    Ok(Json(updated))
}

/// Deactivates a member, freeing cap capacity
pub async fn deactivate_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_team_management(&state, &auth).await?;

    let member = User::find_by_id(&state.db, id)
        .await?
        .filter(|u| u.organization_id == Some(organization_id))
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    if member.role == UserRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner cannot be deactivated".to_string(),
        ));
    }

    User::deactivate(&state.db, member.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
