/// Billing endpoints (tenant-scoped)
///
/// Subscription and plan mutations require the billing capability, which
/// only owners hold in the role table. Usage analytics are readable by any
/// member.
///
/// # Endpoints
///
/// - `GET  /v1/billing/plans` - Plan catalog
/// - `POST /v1/billing/subscription/stripe` - Create a processor subscription
/// - `POST /v1/billing/subscription/pagseguro` - Create a PagSeguro checkout
/// - `POST /v1/billing/upgrade` / `/downgrade` - Reassign the plan
/// - `POST /v1/billing/cancel` - Cancel the subscription
/// - `GET  /v1/billing/analytics?period=...` - Revenue/usage summary

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    services::billing::AnalyticsSummary,
    services::payments::{PagSeguroCheckout, SubscriptionRecord},
    services::period::ReportingPeriod,
};
use atrio_shared::auth::middleware::{AuthContext, OrgContext};
use atrio_shared::models::organization::Organization;
use atrio_shared::models::user::{Action, User};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Create-subscription request body
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Plan to subscribe to
    pub plan_id: Uuid,

    /// Processor price reference (Stripe only)
    pub price_ref: Option<String>,

    /// Existing processor customer reference, if any
    pub customer_ref: Option<String>,
}

/// Plan-change request body
#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    /// Plan to move to
    pub new_plan_id: Uuid,

    /// Processor price reference for the remote subscription, if any
    pub price_ref: Option<String>,
}

/// Query parameters for usage analytics
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Period bucket (default: current_month)
    pub period: Option<String>,
}

/// Verifies the principal holds the billing capability
async fn require_billing_access(
    state: &AppState,
    auth: &AuthContext,
) -> Result<(), ApiError> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !user.role.allows(Action::ManageBilling) {
        return Err(ApiError::Forbidden(
            "Only the organization owner can manage billing".to_string(),
        ));
    }

    Ok(())
}

/// Creates a processor subscription for the organization
///
/// Not idempotent: submitting twice creates two processor subscriptions.
pub async fn create_stripe_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionRecord>> {
    require_billing_access(&state, &auth).await?;

    let price_ref = req
        .price_ref
        .ok_or_else(|| ApiError::BadRequest("price_ref is required".to_string()))?;

    let subscription = state
        .billing()
        .create_stripe_subscription(organization_id, req.plan_id, &price_ref, req.customer_ref)
        .await?;

    Ok(Json(subscription))
}

/// Creates a PagSeguro checkout for the organization
pub async fn create_pagseguro_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<PagSeguroCheckout>> {
    require_billing_access(&state, &auth).await?;

    let checkout = state
        .billing()
        .create_pagseguro_subscription(organization_id, req.plan_id)
        .await?;

    Ok(Json(checkout))
}

/// Moves the organization onto a higher plan
pub async fn upgrade_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<ChangePlanRequest>,
) -> ApiResult<Json<Organization>> {
    require_billing_access(&state, &auth).await?;

    let organization = state
        .billing()
        .upgrade_plan(organization_id, req.new_plan_id, req.price_ref.as_deref())
        .await?;

    Ok(Json(organization))
}

/// Moves the organization onto a lower plan
///
/// Existing usage is not validated against the new caps; an over-limit
/// organization is caught on its next add-attempt.
pub async fn downgrade_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Json(req): Json<ChangePlanRequest>,
) -> ApiResult<Json<Organization>> {
    require_billing_access(&state, &auth).await?;

    let organization = state
        .billing()
        .downgrade_plan(organization_id, req.new_plan_id, req.price_ref.as_deref())
        .await?;

    Ok(Json(organization))
}

/// Cancels the processor subscription and clears the plan
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
) -> ApiResult<StatusCode> {
    require_billing_access(&state, &auth).await?;

    state.billing().cancel_subscription(organization_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns revenue and usage figures for a period bucket
pub async fn usage_analytics(
    State(state): State<AppState>,
    Extension(OrgContext(organization_id)): Extension<OrgContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let period_name = query.period.as_deref().unwrap_or("current_month");
    let period = ReportingPeriod::parse(period_name)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown period: {}", period_name)))?;

    let summary = state
        .billing()
        .usage_analytics(organization_id, period)
        .await?;

    Ok(Json(summary))
}
