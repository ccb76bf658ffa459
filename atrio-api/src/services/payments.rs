/// Payment-processor clients
///
/// This module bridges billing operations to external payment processors:
/// a Stripe-style REST client (form-encoded requests over reqwest) and a
/// simplified PagSeguro checkout client.
///
/// Calls are awaited sequentially within the handler that triggered them;
/// there is no retry or circuit breaker beyond the transport's own
/// timeouts. Subscription creation is not idempotent: calling it twice
/// creates two subscriptions at the processor.
///
/// # Webhook signatures
///
/// Deliveries are signed with the `t=<timestamp>,v1=<hex hmac>` scheme:
/// HMAC-SHA256 over `"{timestamp}.{payload}"` with the shared endpoint
/// secret. [`verify_webhook_signature`] checks this in constant time.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::BillingConfig;

/// Error type for payment-processor operations
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// No API key configured
    #[error("Payment processor is not configured")]
    NotConfigured,

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The processor returned a non-success status
    #[error("Processor returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Webhook signature header missing or malformed
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// A subscription as seen by the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Processor subscription id
    pub id: String,

    /// Processor customer id
    pub customer_id: String,

    /// Price reference the subscription bills against
    pub price_ref: String,

    /// Processor-side status (e.g. "active", "incomplete")
    pub status: String,

    /// End of the current billing period
    pub current_period_end: DateTime<Utc>,

    /// Whether the subscription cancels at period end
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Deserialize)]
struct ApiCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiSubscription {
    id: String,
    customer: String,
    status: String,
    current_period_end: i64,
    cancel_at_period_end: bool,
}

impl ApiSubscription {
    fn into_record(self, price_ref: String) -> SubscriptionRecord {
        SubscriptionRecord {
            id: self.id,
            customer_id: self.customer,
            price_ref,
            status: self.status,
            current_period_end: Utc
                .timestamp_opt(self.current_period_end, 0)
                .single()
                .unwrap_or_else(Utc::now),
            cancel_at_period_end: self.cancel_at_period_end,
        }
    }
}

/// Stripe-style REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    /// Creates a client from billing configuration
    pub fn new(http: reqwest::Client, config: &BillingConfig) -> Self {
        Self {
            http,
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.stripe_api_base.clone(),
        }
    }

    fn ensure_configured(&self) -> Result<(), PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }
        Ok(())
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        self.ensure_configured()?;

        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Creates a customer at the processor
    ///
    /// # Returns
    ///
    /// The processor customer id
    pub async fn create_customer(&self, email: &str, name: &str) -> Result<String, PaymentError> {
        let customer: ApiCustomer = self
            .post_form(
                "/v1/customers",
                &[("email", email.to_string()), ("name", name.to_string())],
            )
            .await?;

        Ok(customer.id)
    }

    /// Creates a subscription for a customer against a price
    ///
    /// Not idempotent: two calls create two subscriptions.
    pub async fn create_subscription(
        &self,
        customer_id: &str,
        price_ref: &str,
    ) -> Result<SubscriptionRecord, PaymentError> {
        let subscription: ApiSubscription = self
            .post_form(
                "/v1/subscriptions",
                &[
                    ("customer", customer_id.to_string()),
                    ("items[0][price]", price_ref.to_string()),
                    ("payment_behavior", "default_incomplete".to_string()),
                ],
            )
            .await?;

        Ok(subscription.into_record(price_ref.to_string()))
    }

    /// Moves an existing subscription onto a different price
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        price_ref: &str,
    ) -> Result<SubscriptionRecord, PaymentError> {
        let subscription: ApiSubscription = self
            .post_form(
                &format!("/v1/subscriptions/{}", subscription_id),
                &[
                    ("items[0][price]", price_ref.to_string()),
                    ("proration_behavior", "create_prorations".to_string()),
                ],
            )
            .await?;

        Ok(subscription.into_record(price_ref.to_string()))
    }

    /// Cancels a subscription immediately
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentError> {
        self.ensure_configured()?;

        let response = self
            .http
            .delete(format!("{}/v1/subscriptions/{}", self.api_base, subscription_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Simplified PagSeguro checkout client
///
/// Creates checkout records pointing at the hosted payment page; the
/// processor reports completion through its webhook.
#[derive(Clone)]
pub struct PagSeguroClient {
    api_base: String,
}

/// A pending PagSeguro checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagSeguroCheckout {
    pub id: String,
    pub amount_cents: i64,
    pub description: String,
    pub status: String,
    pub payment_url: String,
}

impl PagSeguroClient {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            api_base: config.pagseguro_api_base.clone(),
        }
    }

    /// Creates a checkout for the given amount
    pub fn create_checkout(&self, amount_cents: i64, description: &str) -> PagSeguroCheckout {
        let id = format!("pagseguro_{}", Uuid::new_v4().simple());

        PagSeguroCheckout {
            payment_url: format!("{}/checkout/payment.html?code={}", self.api_base, id),
            id,
            amount_cents,
            description: description.to_string(),
            status: "pending".to_string(),
        }
    }
}

/// Verifies a webhook delivery signature
///
/// The signature header has the form `t=<timestamp>,v1=<hex hmac>`; the
/// expected MAC is HMAC-SHA256 over `"{timestamp}.{payload}"` keyed with
/// the shared endpoint secret. Comparison is constant-time.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` when the header is malformed
/// or the MAC does not match.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("Missing timestamp".to_string()))?;
    let signature = signature
        .ok_or_else(|| PaymentError::InvalidSignature("Missing v1 signature".to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature("Invalid secret".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(PaymentError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Constant-time byte comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let secret = "whsec_test";
        let payload = br#"{"type": "customer.subscription.updated"}"#;
        let header = format!("t=1700000000,v1={}", sign(secret, "1700000000", payload));

        assert!(verify_webhook_signature(secret, payload, &header).is_ok());
    }

    #[test]
    fn test_verify_webhook_signature_tampered_payload() {
        let secret = "whsec_test";
        let payload = br#"{"type": "customer.subscription.updated"}"#;
        let header = format!("t=1700000000,v1={}", sign(secret, "1700000000", payload));

        let tampered = br#"{"type": "customer.subscription.deleted"}"#;
        assert!(verify_webhook_signature(secret, tampered, &header).is_err());
    }

    #[test]
    fn test_verify_webhook_signature_wrong_secret() {
        let payload = b"{}";
        let header = format!("t=1,v1={}", sign("secret-a", "1", payload));

        assert!(verify_webhook_signature("secret-b", payload, &header).is_err());
    }

    #[test]
    fn test_verify_webhook_signature_malformed_header() {
        assert!(verify_webhook_signature("s", b"{}", "garbage").is_err());
        assert!(verify_webhook_signature("s", b"{}", "t=123").is_err());
        assert!(verify_webhook_signature("s", b"{}", "v1=abc").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_pagseguro_checkout() {
        let client = PagSeguroClient {
            api_base: "https://sandbox.pagseguro.example".to_string(),
        };

        let checkout = client.create_checkout(9900, "Pro plan");
        assert_eq!(checkout.amount_cents, 9900);
        assert_eq!(checkout.status, "pending");
        assert!(checkout.payment_url.contains(&checkout.id));
    }
}
