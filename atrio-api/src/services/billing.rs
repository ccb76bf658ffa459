/// Billing service
///
/// Bridges entitlement state to the external payment processor and
/// produces usage analytics for dashboards.
///
/// Plan changes only reassign the organization's plan reference: no
/// proration is computed here and existing usage is not validated against
/// the new plan's caps. An organization can be left over-limit after a
/// downgrade; enforcement happens on the next add-attempt, not
/// retroactively.
///
/// Webhook deliveries are applied from their durable [`WebhookEvent`] rows;
/// the replay loop retries rows whose application failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use atrio_shared::entitlements::{EntitlementSnapshot, Entitlements};
use atrio_shared::models::activity::{Activity, RecordActivity};
use atrio_shared::models::financial::FinancialRecord;
use atrio_shared::models::organization::Organization;
use atrio_shared::models::plan::Plan;
use atrio_shared::models::user::{User, UserRole};
use atrio_shared::models::webhook_event::{WebhookEvent, WebhookProvider};
use atrio_shared::usage;

use super::payments::{PagSeguroCheckout, PagSeguroClient, PaymentError, StripeClient, SubscriptionRecord};
use super::period::ReportingPeriod;

/// Error type for billing operations
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Organization does not exist
    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    /// Plan does not exist or is no longer offered
    #[error("Plan not available: {0}")]
    PlanNotAvailable(Uuid),

    /// The organization has no owner with an email to bill
    #[error("Organization has no billing contact")]
    NoBillingContact,

    /// Payment processor failure
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Revenue and usage figures for a reporting period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Period bucket name
    pub period: String,

    /// Window start (inclusive)
    pub start: DateTime<Utc>,

    /// Window end (inclusive)
    pub end: DateTime<Utc>,

    /// Paid revenue within the window, in cents
    pub revenue_cents: i64,

    /// Paid revenue in the comparable prior window
    pub previous_revenue_cents: Option<i64>,

    /// Active users right now
    pub active_users: i64,

    /// Clients right now
    pub clients: i64,

    /// Marketing integrations right now
    pub integrations: i64,

    /// AI strategy generations within the window
    pub ai_generations: i64,

    /// Resolved entitlement limits for context
    pub limits: EntitlementSnapshot,
}

/// Billing service
#[derive(Clone)]
pub struct BillingService {
    db: PgPool,
    stripe: StripeClient,
    pagseguro: PagSeguroClient,
}

impl BillingService {
    /// Creates a billing service
    pub fn new(db: PgPool, stripe: StripeClient, pagseguro: PagSeguroClient) -> Self {
        Self {
            db,
            stripe,
            pagseguro,
        }
    }

    async fn load_organization(&self, id: Uuid) -> Result<Organization, BillingError> {
        Organization::find_by_id(&self.db, id)
            .await?
            .ok_or(BillingError::OrganizationNotFound(id))
    }

    async fn load_offered_plan(&self, id: Uuid) -> Result<Plan, BillingError> {
        let plan = Plan::find_by_id(&self.db, id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(BillingError::PlanNotAvailable(id))?;
        Ok(plan)
    }

    /// Creates a processor subscription and assigns the plan
    ///
    /// When no `customer_ref` is supplied, a customer is created at the
    /// processor from the organization's owner. Calling this twice creates
    /// two processor subscriptions; only the most recent reference is kept
    /// locally.
    pub async fn create_stripe_subscription(
        &self,
        organization_id: Uuid,
        plan_id: Uuid,
        price_ref: &str,
        customer_ref: Option<String>,
    ) -> Result<SubscriptionRecord, BillingError> {
        let organization = self.load_organization(organization_id).await?;
        let plan = self.load_offered_plan(plan_id).await?;

        let customer_id = match customer_ref.or(organization.stripe_customer_id.clone()) {
            Some(id) => id,
            None => {
                let owner_email = User::list_by_organization(&self.db, organization_id)
                    .await?
                    .into_iter()
                    .find(|u| u.role == UserRole::Owner)
                    .map(|u| u.email)
                    .ok_or(BillingError::NoBillingContact)?;

                self.stripe
                    .create_customer(&owner_email, &organization.name)
                    .await?
            }
        };

        let subscription = self.stripe.create_subscription(&customer_id, price_ref).await?;

        Organization::set_billing_refs(&self.db, organization_id, &customer_id, &subscription.id)
            .await?;
        Organization::update_plan(&self.db, organization_id, Some(plan.id)).await?;

        info!(
            organization_id = %organization_id,
            plan = %plan.name,
            subscription = %subscription.id,
            "Created processor subscription"
        );

        Ok(subscription)
    }

    /// Creates a PagSeguro checkout for a plan and assigns it
    pub async fn create_pagseguro_subscription(
        &self,
        organization_id: Uuid,
        plan_id: Uuid,
    ) -> Result<PagSeguroCheckout, BillingError> {
        let organization = self.load_organization(organization_id).await?;
        let plan = self.load_offered_plan(plan_id).await?;

        let checkout = self.pagseguro.create_checkout(
            plan.price_cents,
            &format!("{} plan for {}", plan.name, organization.name),
        );

        Organization::update_plan(&self.db, organization_id, Some(plan.id)).await?;

        Ok(checkout)
    }

    async fn change_plan(
        &self,
        organization_id: Uuid,
        new_plan_id: Uuid,
        price_ref: Option<&str>,
        activity_kind: &str,
    ) -> Result<Organization, BillingError> {
        let organization = self.load_organization(organization_id).await?;
        let plan = self.load_offered_plan(new_plan_id).await?;

        // Move the processor subscription when one exists and a price was
        // supplied. Local reassignment happens regardless.
        if let (Some(subscription_id), Some(price_ref)) =
            (organization.stripe_subscription_id.as_deref(), price_ref)
        {
            self.stripe
                .update_subscription(subscription_id, price_ref)
                .await?;
        }

        let updated = Organization::update_plan(&self.db, organization_id, Some(plan.id))
            .await?
            .ok_or(BillingError::OrganizationNotFound(organization_id))?;

        Activity::record(
            &self.db,
            RecordActivity {
                organization_id,
                kind: activity_kind.to_string(),
                description: format!("Plan changed to {}", plan.name),
                user_id: None,
                client_id: None,
                metadata: serde_json::json!({ "plan_id": plan.id }),
            },
        )
        .await?;

        Ok(updated)
    }

    /// Moves the organization onto a higher plan
    ///
    /// Usage is not re-validated here.
    pub async fn upgrade_plan(
        &self,
        organization_id: Uuid,
        new_plan_id: Uuid,
        price_ref: Option<&str>,
    ) -> Result<Organization, BillingError> {
        self.change_plan(organization_id, new_plan_id, price_ref, "plan_upgraded")
            .await
    }

    /// Moves the organization onto a lower plan
    ///
    /// The organization may be left over-limit; the next add-attempt is
    /// where enforcement happens.
    pub async fn downgrade_plan(
        &self,
        organization_id: Uuid,
        new_plan_id: Uuid,
        price_ref: Option<&str>,
    ) -> Result<Organization, BillingError> {
        self.change_plan(organization_id, new_plan_id, price_ref, "plan_downgraded")
            .await
    }

    /// Cancels the processor subscription, clears the plan, and
    /// soft-deactivates the organization
    ///
    /// The organization row is never removed; historical records keep
    /// referencing it.
    pub async fn cancel_subscription(&self, organization_id: Uuid) -> Result<(), BillingError> {
        let organization = self.load_organization(organization_id).await?;

        if let Some(subscription_id) = organization.stripe_subscription_id.as_deref() {
            self.stripe.cancel_subscription(subscription_id).await?;
        }

        Organization::update_plan(&self.db, organization_id, None).await?;
        Organization::deactivate(&self.db, organization_id).await?;

        info!(organization_id = %organization_id, "Subscription cancelled");
        Ok(())
    }

    /// Aggregates revenue and usage figures for a period bucket
    pub async fn usage_analytics(
        &self,
        organization_id: Uuid,
        period: ReportingPeriod,
    ) -> Result<AnalyticsSummary, BillingError> {
        let window = period.window();
        let (start_date, end_date) = window.date_bounds();

        let revenue_cents =
            FinancialRecord::revenue_between(&self.db, organization_id, start_date, end_date)
                .await?;

        let previous_revenue_cents = match window.previous_date_bounds() {
            Some((prev_start, prev_end)) => Some(
                FinancialRecord::revenue_between(&self.db, organization_id, prev_start, prev_end)
                    .await?,
            ),
            None => None,
        };

        let active_users = usage::count_active_users(&self.db, organization_id).await?;
        let clients = usage::count_clients(&self.db, organization_id).await?;
        let integrations = usage::count_integrations(&self.db, organization_id).await?;
        let ai_generations = usage::count_ai_generations_between(
            &self.db,
            organization_id,
            window.start,
            window.end,
        )
        .await?;

        let limits = Entitlements::new(self.db.clone())
            .resolve_limits(organization_id)
            .await
            .map_err(|e| match e {
                atrio_shared::entitlements::EntitlementError::OrganizationNotFound(id) => {
                    BillingError::OrganizationNotFound(id)
                }
                atrio_shared::entitlements::EntitlementError::DatabaseError(e) => {
                    BillingError::Database(e)
                }
            })?;

        Ok(AnalyticsSummary {
            period: period.as_str().to_string(),
            start: window.start,
            end: window.end,
            revenue_cents,
            previous_revenue_cents,
            active_users,
            clients,
            integrations,
            ai_generations,
            limits,
        })
    }

    /// Applies a persisted webhook event
    ///
    /// Dispatches on the event-type string. Unknown types are logged and
    /// considered applied so they don't clog the replay queue.
    pub async fn process_event(&self, event: &WebhookEvent) -> Result<(), BillingError> {
        match event.provider {
            WebhookProvider::Stripe => self.process_stripe_event(event).await,
            WebhookProvider::Pagseguro => {
                // PagSeguro notifications carry no state we track beyond the
                // subscription confirmation already applied at checkout.
                info!(event_type = %event.event_type, "PagSeguro webhook event");
                Ok(())
            }
        }
    }

    async fn process_stripe_event(&self, event: &WebhookEvent) -> Result<(), BillingError> {
        let object = event
            .payload
            .get("data")
            .and_then(|d| d.get("object"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        match event.event_type.as_str() {
            "customer.subscription.deleted" => {
                let Some(subscription_id) = object.get("id").and_then(|v| v.as_str()) else {
                    warn!(event = %event.id, "Subscription deletion event without id");
                    return Ok(());
                };

                if let Some(organization) =
                    Organization::find_by_stripe_subscription(&self.db, subscription_id).await?
                {
                    Organization::update_plan(&self.db, organization.id, None).await?;
                    info!(
                        organization_id = %organization.id,
                        subscription = subscription_id,
                        "Cleared plan after subscription deletion"
                    );
                } else {
                    warn!(subscription = subscription_id, "No organization for deleted subscription");
                }
            }
            "customer.subscription.updated" => {
                let status = object.get("status").and_then(|v| v.as_str()).unwrap_or("");
                let subscription_id = object.get("id").and_then(|v| v.as_str()).unwrap_or("");

                if matches!(status, "canceled" | "unpaid") {
                    if let Some(organization) =
                        Organization::find_by_stripe_subscription(&self.db, subscription_id)
                            .await?
                    {
                        Organization::update_plan(&self.db, organization.id, None).await?;
                        info!(
                            organization_id = %organization.id,
                            status = status,
                            "Cleared plan after subscription lapse"
                        );
                    }
                } else {
                    info!(subscription = subscription_id, status = status, "Subscription updated");
                }
            }
            "invoice.payment_succeeded" | "payment_intent.succeeded" => {
                info!(event_type = %event.event_type, "Payment confirmed");
            }
            other => {
                info!(event_type = other, "Unhandled webhook event type");
            }
        }

        Ok(())
    }

    /// Replays unprocessed webhook events
    ///
    /// Called on a timer so events whose inline application failed (or
    /// that a crash left untouched) are eventually applied.
    pub async fn process_pending(&self, limit: i64) -> Result<usize, BillingError> {
        let events = WebhookEvent::list_unprocessed(&self.db, limit).await?;
        let mut applied = 0;

        for event in &events {
            match self.process_event(event).await {
                Ok(()) => {
                    WebhookEvent::mark_processed(&self.db, event.id).await?;
                    applied += 1;
                }
                Err(e) => {
                    warn!(event = %event.id, error = %e, "Webhook replay failed");
                    WebhookEvent::mark_failed(&self.db, event.id, &e.to_string()).await?;
                }
            }
        }

        Ok(applied)
    }
}
