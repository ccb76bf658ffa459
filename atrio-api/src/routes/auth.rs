/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration (creates the organization and its owner)
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register an agency and its owner
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use atrio_shared::{
    auth::{jwt, password},
    models::{
        organization::{CreateOrganization, Organization},
        user::{CreateUser, User, UserRole},
    },
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Agency name
    #[validate(length(min = 1, max = 100, message = "Organization name must be 1-100 characters"))]
    pub organization_name: String,

    /// Desired subdomain (lowercase letters, digits, hyphens)
    #[validate(length(min = 3, max = 63, message = "Subdomain must be 3-63 characters"))]
    pub subdomain: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// User ID
    pub user_id: String,

    /// Organization ID
    pub organization_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Organization ID
    pub organization_id: Option<String>,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn validation_details(e: validator::ValidationErrors) -> ApiError {
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
}

fn validate_subdomain(subdomain: &str) -> Result<(), ApiError> {
    let valid = subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-');

    if !valid {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "subdomain".to_string(),
            message: "Subdomain may only contain lowercase letters, digits, and inner hyphens"
                .to_string(),
        }]));
    }

    Ok(())
}

/// Register an agency and its owner
///
/// Creates the organization (no plan assigned yet, so the hard default
/// limits apply) and the owner account in one request.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "ana@acme.com",
///   "password": "SecureP@ss123",
///   "name": "Ana",
///   "organization_name": "Acme Digital",
///   "subdomain": "acme"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email or subdomain already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate().map_err(validation_details)?;
    validate_subdomain(&req.subdomain)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    // Friendly availability check; the unique constraint is the backstop.
    if Organization::find_by_subdomain(&state.db, &req.subdomain)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Subdomain already taken".to_string()));
    }

    let organization = Organization::create(
        &state.db,
        CreateOrganization {
            name: req.organization_name,
            subdomain: req.subdomain,
            plan_id: None,
        },
    )
    .await?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            role: UserRole::Owner,
            organization_id: Some(organization.id),
        },
    )
    .await?;

    let access_claims = jwt::Claims::new(user.id, Some(organization.id), jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, Some(organization.id), jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(RegisterResponse {
        user_id: user.id.to_string(),
        organization_id: organization.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Login endpoint
///
/// Authenticates a user and returns JWT tokens.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate().map_err(validation_details)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let access_claims = jwt::Claims::new(user.id, user.organization_id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, user.organization_id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        organization_id: user.organization_id.map(|id| id.to_string()),
        access_token,
        refresh_token,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subdomain() {
        assert!(validate_subdomain("acme").is_ok());
        assert!(validate_subdomain("acme-digital-2").is_ok());
        assert!(validate_subdomain("Acme").is_err());
        assert!(validate_subdomain("acme_digital").is_err());
        assert!(validate_subdomain("-acme").is_err());
        assert!(validate_subdomain("acme-").is_err());
    }
}
