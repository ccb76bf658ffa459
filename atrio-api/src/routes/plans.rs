/// Plan catalog endpoint
///
/// # Endpoints
///
/// - `GET /v1/plans` - Currently offered plans (public)
/// - `GET /v1/billing/plans` - Same catalog under the billing prefix

use crate::{app::AppState, error::ApiResult};
use atrio_shared::models::plan::Plan;
use axum::{extract::State, Json};

/// Lists currently offered plans, cheapest first
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<Plan>>> {
    let plans = Plan::list_active(&state.db).await?;
    Ok(Json(plans))
}
