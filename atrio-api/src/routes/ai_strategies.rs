/// AI strategy endpoints (tenant-scoped)
///
/// Generation runs behind the `ai_strategies` feature gate: plans without
/// the flag receive a 403 carrying `upgrade: true` before this handler is
/// invoked. Each successful generation is recorded as a
/// `strategy_generated` activity, which is what the usage meter counts.
///
/// # Endpoints
///
/// - `POST   /v1/ai-strategies/generate` - Generate and store a strategy (feature-gated)
/// - `GET    /v1/ai-strategies` - List stored strategies
/// - `DELETE /v1/ai-strategies/:id` - Delete a strategy

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    services::ai::StrategyRequest,
};
use atrio_shared::auth::middleware::{AuthContext, OrgContext};
use atrio_shared::models::{
    activity::{self, Activity, RecordActivity},
    ai_strategy::{AiStrategy, CreateAiStrategy},
    client::Client,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Generate-strategy request body
#[derive(Debug, Deserialize)]
pub struct GenerateStrategyRequest {
    /// Client to generate the strategy for
    pub client_id: Uuid,

    /// Stated goals
    #[serde(default)]
    pub goals: Vec<String>,

    /// Current challenges
    #[serde(default)]
    pub challenges: Vec<String>,

    /// Budget in cents, if known
    pub budget_cents: Option<i64>,

    /// Target audience description
    pub target_audience: Option<String>,

    /// Stated objective label
    pub objective: Option<String>,
}

/// Generates a marketing strategy for a client and stores it
///
/// # Errors
///
/// - `404` when the client does not belong to the organization
/// - `502` when the completion API call fails
pub async fn generate_strategy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<GenerateStrategyRequest>,
) -> ApiResult<(StatusCode, Json<AiStrategy>)> {
    let client = Client::find_by_id_and_organization(&state.db, req.client_id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    let generated = state
        .completions()
        .generate_strategy(&StrategyRequest {
            client_name: client.name.clone(),
            industry: client.industry.clone().unwrap_or_else(|| "General".to_string()),
            goals: req.goals,
            current_challenges: req.challenges,
            budget_cents: req.budget_cents,
            target_audience: req.target_audience,
        })
        .await?;

    let content = serde_json::to_string(&generated)
        .map_err(|e| ApiError::InternalError(format!("Failed to serialize strategy: {}", e)))?;

    let strategy = AiStrategy::create(
        &state.db,
        CreateAiStrategy {
            organization_id,
            client_id: client.id,
            title: generated.title.clone(),
            content,
            kind: "marketing_strategy".to_string(),
            objective: req.objective,
        },
    )
    .await?;

    // The metered event: usage analytics count these rows.
    Activity::record(
        &state.db,
        RecordActivity {
            organization_id,
            kind: activity::KIND_STRATEGY_GENERATED.to_string(),
            description: format!("AI strategy generated: {}", strategy.title),
            user_id: Some(auth.user_id),
            client_id: Some(client.id),
            metadata: serde_json::json!({ "strategy_id": strategy.id }),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(strategy)))
}

/// Lists stored strategies of the organization
pub async fn list_strategies(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<Json<Vec<AiStrategy>>> {
    let strategies = AiStrategy::list_by_organization(&state.db, organization_id).await?;
    Ok(Json(strategies))
}

/// Deletes a stored strategy
pub async fn delete_strategy(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = AiStrategy::delete(&state.db, id, organization_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Strategy not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
