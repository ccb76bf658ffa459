/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use atrio_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = atrio_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{organization, security},
    services::{
        ai::CompletionClient,
        billing::BillingService,
        payments::{PagSeguroClient, StripeClient},
    },
};
use atrio_shared::auth::{jwt, middleware::AuthContext};
use atrio_shared::entitlements::{Entitlements, FeatureKey};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Shared HTTP client for outbound calls
    pub http: reqwest::Client,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Entitlement evaluator over this state's pool
    pub fn entitlements(&self) -> Entitlements {
        Entitlements::new(self.db.clone())
    }

    /// Billing service over this state's pool and clients
    pub fn billing(&self) -> BillingService {
        BillingService::new(
            self.db.clone(),
            StripeClient::new(self.http.clone(), &self.config.billing),
            PagSeguroClient::new(&self.config.billing),
        )
    }

    /// Completion API client
    pub fn completions(&self) -> CompletionClient {
        CompletionClient::new(self.http.clone(), &self.config.ai)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/{register,login,refresh}   # Public
///     ├── /plans                           # Public plan catalog
///     ├── /webhooks/{stripe,pagseguro}     # Public, signature-checked
///     ├── /organizations/current           # JWT (GET/PUT)
///     └── [tenant-gated: JWT + org gate]
///         ├── /clients[/:id]               # POST admission-checked
///         ├── /team[/:id]                  # POST admission-checked
///         ├── /tasks[/:id]
///         ├── /financial[...]
///         ├── /dashboard/metrics
///         ├── /activities
///         ├── /ai-strategies[...]          # generate feature-gated
///         ├── /integrations[...]           # connect feature-gated
///         └── /billing/...
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first): security headers, CORS, tracing;
/// then per-nest JWT authentication, tenant gate, and feature gates.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Webhook routes (public; signature verified in the handler)
    let webhook_routes = Router::new()
        .route("/stripe", post(routes::webhooks::stripe_webhook))
        .route("/pagseguro", post(routes::webhooks::pagseguro_webhook));

    // Authenticated but not tenant-gated: the organization comes from the
    // principal itself here.
    let account_routes = Router::new()
        .route(
            "/organizations/current",
            get(routes::organizations::current_organization)
                .put(routes::organizations::update_current_organization),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Client CRUD; POST runs through the admission check
    let client_routes = Router::new()
        .route("/", get(routes::clients::list_clients))
        .route("/", post(routes::clients::create_client))
        .route("/:id", get(routes::clients::get_client))
        .route("/:id", put(routes::clients::update_client))
        .route("/:id", delete(routes::clients::delete_client));

    let team_routes = Router::new()
        .route("/", get(routes::team::list_members))
        .route("/", post(routes::team::invite_member))
        .route("/:id", put(routes::team::update_member_role))
        .route("/:id", delete(routes::team::deactivate_member));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks))
        .route("/", post(routes::tasks::create_task))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task));

    let financial_routes = Router::new()
        .route("/", get(routes::financial::list_records))
        .route("/", post(routes::financial::create_record))
        .route("/:id/pay", post(routes::financial::mark_record_paid))
        .route("/:id", delete(routes::financial::delete_record));

    // Strategy generation sits behind the ai_strategies feature gate;
    // listing stored strategies does not.
    let ai_strategy_routes = Router::new()
        .route("/", get(routes::ai_strategies::list_strategies))
        .route("/:id", delete(routes::ai_strategies::delete_strategy))
        .route(
            "/generate",
            post(routes::ai_strategies::generate_strategy).layer(axum::middleware::from_fn(
                organization::require_feature(state.clone(), FeatureKey::AiStrategies),
            )),
        );

    let integration_routes = Router::new()
        .route("/", get(routes::integrations::list_integrations))
        .route("/:id", put(routes::integrations::update_integration))
        .route("/:id", delete(routes::integrations::delete_integration))
        .route(
            "/",
            post(routes::integrations::connect_integration).layer(axum::middleware::from_fn(
                organization::require_feature(state.clone(), FeatureKey::Integrations),
            )),
        );

    let billing_routes = Router::new()
        .route("/plans", get(routes::plans::list_plans))
        .route(
            "/subscription/stripe",
            post(routes::billing::create_stripe_subscription),
        )
        .route(
            "/subscription/pagseguro",
            post(routes::billing::create_pagseguro_subscription),
        )
        .route("/upgrade", post(routes::billing::upgrade_plan))
        .route("/downgrade", post(routes::billing::downgrade_plan))
        .route("/cancel", post(routes::billing::cancel_subscription))
        .route("/analytics", get(routes::billing::usage_analytics));

    // Tenant-gated nest: JWT first, then the organization-access gate
    let tenant_routes = Router::new()
        .nest("/clients", client_routes)
        .nest("/team", team_routes)
        .nest("/tasks", task_routes)
        .nest("/financial", financial_routes)
        .nest("/ai-strategies", ai_strategy_routes)
        .nest("/integrations", integration_routes)
        .nest("/billing", billing_routes)
        .route("/dashboard/metrics", get(routes::dashboard::dashboard_metrics))
        .route("/activities", get(routes::dashboard::recent_activities))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            organization::organization_access_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/webhooks", webhook_routes)
        .route("/plans", get(routes::plans::list_plans))
        .merge(account_routes)
        .merge(tenant_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(
            security::create_security_headers_middleware(state.config.api.production),
        ))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the JWT from the Authorization header, then
/// injects [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::BadRequest("Expected Bearer token".to_string())
    })?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let auth_context = AuthContext::from_claims(claims.sub, claims.organization_id);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
