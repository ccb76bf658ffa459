/// Entitlement evaluation for multi-tenant plan limits
///
/// This module answers admission and feature-gate questions for a tenant:
/// can the organization add another user or client, and does its plan
/// include a given feature.
///
/// # Resolution order
///
/// Each limit is resolved per field, independently:
///
/// 1. the plan's value, when the organization has a plan and the plan sets
///    that field;
/// 2. else the organization's own override field;
/// 3. else a hard default (`max_users = 5`, `max_clients = 50`, all feature
///    flags false).
///
/// An organization whose plan sets only `max_users` therefore still takes
/// its `max_clients` from the override or default. Feature flags and the
/// free-form feature list come from the plan alone: no plan means no
/// feature access, which is a plain `false`, not an error.
///
/// # Example
///
/// ```no_run
/// use atrio_shared::entitlements::{Entitlements, FeatureKey};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let entitlements = Entitlements::new(pool);
///
/// if !entitlements.can_add_client(org_id).await? {
///     return Err("Client limit reached".into());
/// }
///
/// let generates_ai = entitlements
///     .has_feature_access(org_id, &FeatureKey::AiStrategies)
///     .await?;
/// # Ok(())
/// # }
/// ```

use crate::models::organization::Organization;
use crate::models::plan::Plan;
use crate::usage;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Default user cap applied when neither plan nor override sets one
pub const DEFAULT_MAX_USERS: i32 = 5;

/// Default client cap applied when neither plan nor override sets one
pub const DEFAULT_MAX_CLIENTS: i32 = 50;

/// Error type for entitlement evaluation
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    /// The organization does not exist
    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Feature keys understood by the gate
///
/// The three named variants map to dedicated plan columns; anything else is
/// matched against the plan's free-form `features` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKey {
    /// AI strategy generation
    AiStrategies,

    /// Marketing platform integrations
    Integrations,

    /// Advanced reporting
    AdvancedReports,

    /// Any other key, looked up in the plan's features list
    Custom(String),
}

impl FeatureKey {
    /// Parses a wire-format key (e.g. from a route definition)
    pub fn parse(key: &str) -> Self {
        match key {
            "ai_strategies" => FeatureKey::AiStrategies,
            "integrations" => FeatureKey::Integrations,
            "advanced_reports" => FeatureKey::AdvancedReports,
            other => FeatureKey::Custom(other.to_string()),
        }
    }

    /// Wire-format name of the key
    pub fn as_str(&self) -> &str {
        match self {
            FeatureKey::AiStrategies => "ai_strategies",
            FeatureKey::Integrations => "integrations",
            FeatureKey::AdvancedReports => "advanced_reports",
            FeatureKey::Custom(key) => key,
        }
    }
}

/// Resolved, effective limits for a tenant at a point in time
///
/// Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    /// Effective active-user cap
    pub max_users: i32,

    /// Effective client cap
    pub max_clients: i32,

    /// AI strategy generation included
    pub has_ai_strategies: bool,

    /// Marketing integrations included
    pub has_integrations: bool,

    /// Advanced reports included
    pub has_advanced_reports: bool,

    /// Free-form feature flags from the plan
    pub features: Vec<String>,
}

impl Default for EntitlementSnapshot {
    fn default() -> Self {
        Self {
            max_users: DEFAULT_MAX_USERS,
            max_clients: DEFAULT_MAX_CLIENTS,
            has_ai_strategies: false,
            has_integrations: false,
            has_advanced_reports: false,
            features: Vec::new(),
        }
    }
}

impl EntitlementSnapshot {
    /// Resolves the effective limits from a plan and an organization
    ///
    /// Pure function; the per-field precedence documented at module level
    /// lives here and nowhere else.
    pub fn resolve(plan: Option<&Plan>, organization: &Organization) -> Self {
        let max_users = plan
            .and_then(|p| p.max_users)
            .or(organization.max_users)
            .unwrap_or(DEFAULT_MAX_USERS);

        let max_clients = plan
            .and_then(|p| p.max_clients)
            .or(organization.max_clients)
            .unwrap_or(DEFAULT_MAX_CLIENTS);

        Self {
            max_users,
            max_clients,
            has_ai_strategies: plan.map(|p| p.has_ai_strategies).unwrap_or(false),
            has_integrations: plan.map(|p| p.has_integrations).unwrap_or(false),
            has_advanced_reports: plan.map(|p| p.has_advanced_reports).unwrap_or(false),
            features: plan.map(|p| p.features.clone()).unwrap_or_default(),
        }
    }

    /// Whether an organization with `current` active users may add another
    ///
    /// Exactly at the cap denies.
    pub fn admits_user(&self, current: i64) -> bool {
        current < self.max_users as i64
    }

    /// Whether an organization with `current` clients may add another
    pub fn admits_client(&self, current: i64) -> bool {
        current < self.max_clients as i64
    }

    /// Whether the snapshot grants a feature
    pub fn has_feature(&self, key: &FeatureKey) -> bool {
        match key {
            FeatureKey::AiStrategies => self.has_ai_strategies,
            FeatureKey::Integrations => self.has_integrations,
            FeatureKey::AdvancedReports => self.has_advanced_reports,
            FeatureKey::Custom(name) => self.features.iter().any(|f| f == name),
        }
    }
}

/// Entitlement evaluation service
///
/// Pure reads: nothing here mutates state. A dangling plan reference
/// degrades to the organization override and defaults rather than failing;
/// only a missing organization is an error.
#[derive(Clone)]
pub struct Entitlements {
    db: PgPool,
}

impl Entitlements {
    /// Creates a new evaluator
    pub fn new(db: PgPool) -> Self {
        Entitlements { db }
    }

    /// Loads the organization and its plan (if any)
    async fn load(
        &self,
        organization_id: Uuid,
    ) -> Result<(Organization, Option<Plan>), EntitlementError> {
        let organization = Organization::find_by_id(&self.db, organization_id)
            .await?
            .ok_or(EntitlementError::OrganizationNotFound(organization_id))?;

        let plan = match organization.plan_id {
            Some(plan_id) => Plan::find_by_id(&self.db, plan_id).await?,
            None => None,
        };

        Ok((organization, plan))
    }

    /// Computes the effective entitlement snapshot for a tenant
    ///
    /// # Errors
    ///
    /// Returns `EntitlementError::OrganizationNotFound` if the organization
    /// does not exist; database failures propagate.
    pub async fn resolve_limits(
        &self,
        organization_id: Uuid,
    ) -> Result<EntitlementSnapshot, EntitlementError> {
        let (organization, plan) = self.load(organization_id).await?;
        Ok(EntitlementSnapshot::resolve(plan.as_ref(), &organization))
    }

    /// Whether the organization may add another active user
    ///
    /// Advisory read: the enforced admission path is the conditional insert
    /// in `User::create_within_limit`.
    pub async fn can_add_user(&self, organization_id: Uuid) -> Result<bool, EntitlementError> {
        let snapshot = self.resolve_limits(organization_id).await?;
        let current = usage::count_active_users(&self.db, organization_id).await?;
        Ok(snapshot.admits_user(current))
    }

    /// Whether the organization may add another client
    ///
    /// Advisory read; see `Client::create_within_limit` for the enforced
    /// path.
    pub async fn can_add_client(&self, organization_id: Uuid) -> Result<bool, EntitlementError> {
        let snapshot = self.resolve_limits(organization_id).await?;
        let current = usage::count_clients(&self.db, organization_id).await?;
        Ok(snapshot.admits_client(current))
    }

    /// Whether the organization's plan grants a feature
    ///
    /// No plan means `false`, not an error.
    pub async fn has_feature_access(
        &self,
        organization_id: Uuid,
        key: &FeatureKey,
    ) -> Result<bool, EntitlementError> {
        let (_, plan) = self.load(organization_id).await?;

        let Some(plan) = plan else {
            return Ok(false);
        };

        Ok(match key {
            FeatureKey::AiStrategies => plan.has_ai_strategies,
            FeatureKey::Integrations => plan.has_integrations,
            FeatureKey::AdvancedReports => plan.has_advanced_reports,
            FeatureKey::Custom(name) => plan.features.iter().any(|f| f == name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_plan() -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "Pro".to_string(),
            description: None,
            price_cents: 9900,
            features: vec!["priority_support".to_string()],
            max_users: Some(25),
            max_clients: Some(500),
            has_ai_strategies: true,
            has_integrations: true,
            has_advanced_reports: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn test_organization(max_users: Option<i32>, max_clients: Option<i32>) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            subdomain: "acme".to_string(),
            plan_id: None,
            is_active: true,
            max_users,
            max_clients,
            settings: serde_json::json!({}),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_no_plan_no_override_uses_defaults() {
        let org = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(None, &org);

        assert_eq!(snapshot.max_users, DEFAULT_MAX_USERS);
        assert_eq!(snapshot.max_clients, DEFAULT_MAX_CLIENTS);
        assert!(!snapshot.has_ai_strategies);
        assert!(!snapshot.has_integrations);
        assert!(!snapshot.has_advanced_reports);
        assert!(snapshot.features.is_empty());
    }

    #[test]
    fn test_resolve_plan_wins_over_override() {
        let plan = test_plan();
        let org = test_organization(Some(3), Some(10));
        let snapshot = EntitlementSnapshot::resolve(Some(&plan), &org);

        assert_eq!(snapshot.max_users, 25);
        assert_eq!(snapshot.max_clients, 500);
    }

    #[test]
    fn test_resolve_per_field_independence() {
        // Plan sets only max_users; organization override sets only
        // max_clients. Each field resolves on its own.
        let mut plan = test_plan();
        plan.max_users = Some(12);
        plan.max_clients = None;
        let org = test_organization(None, Some(80));

        let snapshot = EntitlementSnapshot::resolve(Some(&plan), &org);
        assert_eq!(snapshot.max_users, 12);
        assert_eq!(snapshot.max_clients, 80);

        // And a plan field left unset with no override falls to the default,
        // not to zero.
        let org_without_override = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(Some(&plan), &org_without_override);
        assert_eq!(snapshot.max_clients, DEFAULT_MAX_CLIENTS);
    }

    #[test]
    fn test_resolve_override_without_plan() {
        let org = test_organization(Some(10), None);
        let snapshot = EntitlementSnapshot::resolve(None, &org);

        assert_eq!(snapshot.max_users, 10);
        assert_eq!(snapshot.max_clients, DEFAULT_MAX_CLIENTS);
    }

    #[test]
    fn test_admits_client_boundary() {
        let mut plan = test_plan();
        plan.max_clients = Some(2);
        let org = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(Some(&plan), &org);

        assert!(snapshot.admits_client(0));
        assert!(snapshot.admits_client(1));
        // Exactly at the cap must deny.
        assert!(!snapshot.admits_client(2));
        assert!(!snapshot.admits_client(3));
    }

    #[test]
    fn test_admits_user_boundary() {
        let org = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(None, &org);

        assert!(snapshot.admits_user(4));
        assert!(!snapshot.admits_user(5));
    }

    #[test]
    fn test_feature_key_parse() {
        assert_eq!(FeatureKey::parse("ai_strategies"), FeatureKey::AiStrategies);
        assert_eq!(FeatureKey::parse("integrations"), FeatureKey::Integrations);
        assert_eq!(
            FeatureKey::parse("advanced_reports"),
            FeatureKey::AdvancedReports
        );
        assert_eq!(
            FeatureKey::parse("white_label"),
            FeatureKey::Custom("white_label".to_string())
        );
    }

    #[test]
    fn test_feature_key_roundtrip() {
        for key in ["ai_strategies", "integrations", "advanced_reports", "custom_x"] {
            assert_eq!(FeatureKey::parse(key).as_str(), key);
        }
    }

    #[test]
    fn test_has_feature_mirrors_plan_flags() {
        let plan = test_plan();
        let org = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(Some(&plan), &org);

        assert_eq!(
            snapshot.has_feature(&FeatureKey::AiStrategies),
            plan.has_ai_strategies
        );
        assert_eq!(
            snapshot.has_feature(&FeatureKey::AdvancedReports),
            plan.has_advanced_reports
        );
        // Custom keys mirror list membership.
        assert!(snapshot.has_feature(&FeatureKey::Custom("priority_support".to_string())));
        assert!(!snapshot.has_feature(&FeatureKey::Custom("white_label".to_string())));
    }

    #[test]
    fn test_no_plan_grants_no_features() {
        let org = test_organization(None, None);
        let snapshot = EntitlementSnapshot::resolve(None, &org);

        assert!(!snapshot.has_feature(&FeatureKey::AiStrategies));
        assert!(!snapshot.has_feature(&FeatureKey::Custom("anything".to_string())));
    }

    // Integration tests for database-backed evaluation require a running database
}
