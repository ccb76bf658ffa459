/// Marketing integration endpoints (tenant-scoped)
///
/// Connecting a platform runs behind the `integrations` feature gate.
///
/// # Endpoints
///
/// - `GET    /v1/integrations` - List connections
/// - `POST   /v1/integrations` - Connect a platform (feature-gated)
/// - `PUT    /v1/integrations/:id` - Update connection state
/// - `DELETE /v1/integrations/:id` - Disconnect

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use atrio_shared::auth::middleware::OrgContext;
use atrio_shared::models::integration::{
    CreateIntegration, IntegrationPlatform, IntegrationStatus, MarketingIntegration,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Connect-integration request body
#[derive(Debug, Deserialize)]
pub struct ConnectIntegrationRequest {
    /// Platform to connect
    pub platform: IntegrationPlatform,

    /// Platform-specific settings
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Lists the organization's integrations
pub async fn list_integrations(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<MarketingIntegration>>> {
    let integrations =
        MarketingIntegration::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(integrations))
}

/// Connects a marketing platform
pub async fn connect_integration(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<ConnectIntegrationRequest>,
) -> ApiResult<(StatusCode, Json<MarketingIntegration>)> {
    let settings = if req.settings.is_null() {
        serde_json::json!({})
    } else {
        req.settings
    };

    let integration = MarketingIntegration::create(
        &state.db,
        CreateIntegration {
            organization_id,
            platform: req.platform,
            settings,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(integration)))
}

/// Status-update request body
#[derive(Debug, Deserialize)]
pub struct UpdateIntegrationRequest {
    /// New connection state
    pub status: IntegrationStatus,
}

/// Updates an integration's connection state
pub async fn update_integration(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIntegrationRequest>,
) -> ApiResult<StatusCode> {
    let updated =
        MarketingIntegration::update_status(&state.db, id, organization_id, req.status).await?;

    if !updated {
        return Err(ApiError::NotFound("Integration not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Disconnects and removes an integration
pub async fn delete_integration(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = MarketingIntegration::delete(&state.db, id, organization_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Integration not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
