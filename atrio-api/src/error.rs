/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to appropriate HTTP status codes.
///
/// Plan-related rejections carry an `"upgrade": true` field in the body so
/// the caller can distinguish "buy a bigger plan" from a hard permission
/// error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401) - no valid session
    Unauthorized(String),

    /// Forbidden (403) - tenant membership or role failure
    Forbidden(String),

    /// Forbidden (403) - plan limit or feature gate; response carries upgrade: true
    UpgradeRequired(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g. duplicate email or subdomain
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Bad gateway (502) - payment/AI/social call failed
    UpstreamFailure(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Present and true when the failure is plan-related
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<bool>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::UpgradeRequired(msg) => write!(f, "Upgrade required: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::UpstreamFailure(msg) => write!(f, "Upstream failure: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details, upgrade) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg, None, None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None, None),
            ApiError::UpgradeRequired(msg) => (
                StatusCode::FORBIDDEN,
                "upgrade_required",
                msg,
                None,
                Some(true),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
                None,
            ),
            ApiError::UpstreamFailure(msg) => {
                // Log the real failure, return a generic message
                tracing::error!("Upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_failure",
                    "An external service request failed".to_string(),
                    None,
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            upgrade,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violations
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint.contains("subdomain") {
                        return ApiError::Conflict("Subdomain already taken".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert entitlement errors to API errors
impl From<atrio_shared::entitlements::EntitlementError> for ApiError {
    fn from(err: atrio_shared::entitlements::EntitlementError) -> Self {
        match err {
            atrio_shared::entitlements::EntitlementError::OrganizationNotFound(id) => {
                ApiError::NotFound(format!("Organization not found: {}", id))
            }
            atrio_shared::entitlements::EntitlementError::DatabaseError(err) => {
                ApiError::InternalError(format!("Database error: {}", err))
            }
        }
    }
}

/// Convert auth middleware errors to API errors
impl From<atrio_shared::auth::middleware::AuthError> for ApiError {
    fn from(err: atrio_shared::auth::middleware::AuthError) -> Self {
        match err {
            atrio_shared::auth::middleware::AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            atrio_shared::auth::middleware::AuthError::InvalidFormat(msg) => {
                ApiError::BadRequest(msg)
            }
            atrio_shared::auth::middleware::AuthError::InvalidToken(msg) => {
                ApiError::Unauthorized(msg)
            }
        }
    }
}

/// Convert JWT errors to API errors
impl From<atrio_shared::auth::jwt::JwtError> for ApiError {
    fn from(err: atrio_shared::auth::jwt::JwtError) -> Self {
        match err {
            atrio_shared::auth::jwt::JwtError::Expired => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            atrio_shared::auth::jwt::JwtError::InvalidIssuer => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert password errors to API errors
impl From<atrio_shared::auth::password::PasswordError> for ApiError {
    fn from(err: atrio_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert payment-processor errors to API errors
impl From<crate::services::payments::PaymentError> for ApiError {
    fn from(err: crate::services::payments::PaymentError) -> Self {
        ApiError::UpstreamFailure(format!("Payment processor error: {}", err))
    }
}

/// Convert billing service errors to API errors
impl From<crate::services::billing::BillingError> for ApiError {
    fn from(err: crate::services::billing::BillingError) -> Self {
        use crate::services::billing::BillingError;
        match err {
            BillingError::OrganizationNotFound(id) => {
                ApiError::NotFound(format!("Organization not found: {}", id))
            }
            BillingError::PlanNotAvailable(id) => {
                ApiError::NotFound(format!("Plan not available: {}", id))
            }
            BillingError::NoBillingContact => {
                ApiError::BadRequest("Organization has no billing contact".to_string())
            }
            BillingError::Payment(e) => e.into(),
            BillingError::Database(e) => e.into(),
        }
    }
}

/// Convert AI client errors to API errors
impl From<crate::services::ai::AiError> for ApiError {
    fn from(err: crate::services::ai::AiError) -> Self {
        ApiError::UpstreamFailure(format!("Completion API error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Client not found".to_string());
        assert_eq!(err.to_string(), "Not found: Client not found");
    }

    #[test]
    fn test_upgrade_required_body() {
        let response = ApiError::UpgradeRequired("Client limit reached".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_upgrade_flag_serialization() {
        let body = ErrorResponse {
            error: "upgrade_required".to_string(),
            message: "Client limit reached".to_string(),
            details: None,
            upgrade: Some(true),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"upgrade\":true"));

        // The flag is omitted entirely for non-plan errors.
        let body = ErrorResponse {
            error: "forbidden".to_string(),
            message: "No access".to_string(),
            details: None,
            upgrade: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("upgrade"));
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
