/// Tenant-access and feature-entitlement gates
///
/// Two sequential gates guard tenant-scoped handlers:
///
/// 1. **Organization-access gate**: requires an authenticated principal and
///    a tenant identifier (header `x-organization-id`, JSON body field
///    `organizationId`, or query parameter `organizationId` — first
///    non-empty value wins). The principal's stored organization must match
///    the supplied tenant; on success the resolved tenant id is attached to
///    the request as [`OrgContext`].
/// 2. **Feature-access gate**: runs after the first gate and rejects with a
///    403 carrying `upgrade: true` when the organization's plan does not
///    include the required feature.
///
/// Each gate either passes control forward or short-circuits with a
/// terminal response. No retry, no partial success.

use crate::{app::AppState, error::ApiError};
use atrio_shared::auth::middleware::{AuthContext, OrgContext};
use atrio_shared::entitlements::FeatureKey;
use atrio_shared::models::user::User;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the tenant identifier
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Largest request body the gate will buffer while looking for a tenant id
const MAX_BUFFERED_BODY_BYTES: usize = 1024 * 1024;

/// Extracts `organizationId` from a query string
fn organization_id_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "organizationId" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Extracts `organizationId` from a JSON body
fn organization_id_from_body(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value
        .get("organizationId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Organization-access middleware
///
/// Must run after JWT authentication. When the tenant id is not in the
/// header, the body is buffered (and replayed for the handler) to check
/// for it before falling back to the query string.
///
/// # Errors
///
/// - `401` when no authenticated principal is present
/// - `400` when no tenant id is supplied or it is not a UUID
/// - `403` when the principal does not belong to the supplied tenant
pub async fn organization_access_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let header_value = req
        .headers()
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from);

    // Header wins; otherwise buffer the body to look for organizationId,
    // then fall back to the query string.
    let (mut req, supplied) = match header_value {
        Some(value) => (req, Some(value)),
        None => {
            let (parts, body) = req.into_parts();
            let bytes = axum::body::to_bytes(body, MAX_BUFFERED_BODY_BYTES)
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

            let supplied = organization_id_from_body(&bytes).or_else(|| {
                parts.uri.query().and_then(organization_id_from_query)
            });

            (Request::from_parts(parts, Body::from(bytes)), supplied)
        }
    };

    let supplied =
        supplied.ok_or_else(|| ApiError::BadRequest("Organization id is required".to_string()))?;

    let organization_id = Uuid::parse_str(&supplied)
        .map_err(|_| ApiError::BadRequest("Invalid organization id".to_string()))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if user.organization_id != Some(organization_id) {
        return Err(ApiError::Forbidden(
            "Access denied to this organization".to_string(),
        ));
    }

    req.extensions_mut().insert(OrgContext(organization_id));

    Ok(next.run(req).await)
}

/// Creates a feature-access middleware for a specific feature
///
/// Runs after the organization-access gate. Rejects with 403 and
/// `upgrade: true` when the plan does not grant the feature, so callers
/// can tell a plan gap from a hard permission error.
///
/// # Example
///
/// ```ignore
/// let gated = Router::new()
///     .route("/generate", post(generate))
///     .layer(middleware::from_fn(require_feature(
///         state.clone(),
///         FeatureKey::AiStrategies,
///     )));
/// ```
pub fn require_feature(
    state: AppState,
    feature: FeatureKey,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, ApiError>> + Send>,
> + Clone {
    move |req, next| {
        let state = state.clone();
        let feature = feature.clone();
        Box::pin(async move {
            let OrgContext(organization_id) = req
                .extensions()
                .get::<OrgContext>()
                .copied()
                .ok_or_else(|| ApiError::BadRequest("Organization id is required".to_string()))?;

            let allowed = state
                .entitlements()
                .has_feature_access(organization_id, &feature)
                .await?;

            if !allowed {
                return Err(ApiError::UpgradeRequired(format!(
                    "Access denied to feature: {}",
                    feature.as_str()
                )));
            }

            Ok(next.run(req).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_id_from_query() {
        assert_eq!(
            organization_id_from_query("organizationId=abc&x=1"),
            Some("abc".to_string())
        );
        assert_eq!(
            organization_id_from_query("x=1&organizationId=abc"),
            Some("abc".to_string())
        );
        assert_eq!(organization_id_from_query("organizationId="), None);
        assert_eq!(organization_id_from_query("other=abc"), None);
        assert_eq!(organization_id_from_query(""), None);
    }

    #[test]
    fn test_organization_id_from_body() {
        let body = br#"{"organizationId": "f3b7b2c0-0000-0000-0000-000000000000", "name": "x"}"#;
        assert_eq!(
            organization_id_from_body(body),
            Some("f3b7b2c0-0000-0000-0000-000000000000".to_string())
        );

        assert_eq!(organization_id_from_body(br#"{"name": "x"}"#), None);
        assert_eq!(organization_id_from_body(br#"{"organizationId": ""}"#), None);
        assert_eq!(organization_id_from_body(b"not json"), None);
        assert_eq!(organization_id_from_body(b""), None);
    }
}
