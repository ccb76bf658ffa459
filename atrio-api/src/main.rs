//! # Atrio API Server
//!
//! Multi-tenant agency-management backend: client and task CRUD, plan
//! entitlements, billing, usage analytics, and AI-assisted strategy
//! generation.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p atrio-api
//! ```

use atrio_api::{
    app::{build_router, AppState},
    config::Config,
};
use atrio_shared::db::{migrations, pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the webhook replay loop scans for unapplied events
const WEBHOOK_REPLAY_INTERVAL_SECS: u64 = 60;

/// How many events one replay pass applies at most
const WEBHOOK_REPLAY_BATCH: i64 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrio_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Atrio API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db).await?;

    let state = AppState::new(db, config);

    // Webhook replay: applies events whose inline processing failed or was
    // interrupted. Runs on its own timer, no coordination with the request
    // path.
    let replay_state = state.clone();
    tokio::spawn(async move {
        let billing = replay_state.billing();
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(WEBHOOK_REPLAY_INTERVAL_SECS));

        loop {
            ticker.tick().await;
            match billing.process_pending(WEBHOOK_REPLAY_BATCH).await {
                Ok(0) => {}
                Ok(applied) => tracing::info!(applied, "Replayed webhook events"),
                Err(e) => tracing::warn!(error = %e, "Webhook replay pass failed"),
            }
        }
    });

    let bind_address = state.config.bind_address();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await?;

    Ok(())
}
