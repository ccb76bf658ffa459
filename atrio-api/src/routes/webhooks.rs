/// Payment-processor webhook endpoints
///
/// Unauthenticated, signature-checked when a shared secret is configured.
/// The raw event is persisted to the durable inbox *before* any local
/// state is applied; a processing failure after persistence still returns
/// 200 because the replay loop will retry from the stored row. A signature
/// failure returns 400 with nothing persisted.
///
/// # Endpoints
///
/// - `POST /v1/webhooks/stripe`
/// - `POST /v1/webhooks/pagseguro`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    services::payments,
};
use atrio_shared::models::webhook_event::{WebhookEvent, WebhookProvider};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::warn;

/// Webhook acknowledgement body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

async fn persist_and_apply(
    state: &AppState,
    provider: WebhookProvider,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(), ApiError> {
    let event = WebhookEvent::record(&state.db, provider, event_type, payload).await?;

    // Apply inline; a failure here is retried by the replay loop, so the
    // delivery is still acknowledged.
    match state.billing().process_event(&event).await {
        Ok(()) => {
            WebhookEvent::mark_processed(&state.db, event.id).await?;
        }
        Err(e) => {
            warn!(event = %event.id, error = %e, "Webhook application failed, left for replay");
            WebhookEvent::mark_failed(&state.db, event.id, &e.to_string()).await?;
        }
    }

    Ok(())
}

/// Stripe webhook handler
///
/// # Errors
///
/// - `400` on a signature mismatch (when a secret is configured) or an
///   unparsable payload
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    if let Some(secret) = state.config.billing.stripe_webhook_secret.as_deref() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing signature header".to_string()))?;

        payments::verify_webhook_signature(secret, &body, signature)
            .map_err(|e| ApiError::BadRequest(format!("Webhook signature rejected: {}", e)))?;
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let event_type = payload
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    persist_and_apply(&state, WebhookProvider::Stripe, &event_type, payload).await?;

    Ok(Json(WebhookAck { received: true }))
}

/// PagSeguro webhook handler
pub async fn pagseguro_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    let event_type = payload
        .get("notificationType")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    persist_and_apply(&state, WebhookProvider::Pagseguro, &event_type, payload).await?;

    Ok(Json(WebhookAck { received: true }))
}
