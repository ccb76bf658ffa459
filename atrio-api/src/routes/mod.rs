/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh)
/// - `organizations`: Current-organization endpoint
/// - `plans`: Plan catalog
/// - `clients`: Tenant-scoped client CRUD with admission checks
/// - `team`: Member management with user-cap admission checks
/// - `tasks`: Tenant-scoped task CRUD
/// - `financial`: Financial records (invoices, payments, contracts)
/// - `dashboard`: Aggregated dashboard metrics
/// - `ai_strategies`: Feature-gated AI strategy generation
/// - `integrations`: Feature-gated marketing integrations
/// - `billing`: Subscriptions, plan changes, usage analytics
/// - `webhooks`: Payment-processor callbacks

pub mod ai_strategies;
pub mod auth;
pub mod billing;
pub mod clients;
pub mod dashboard;
pub mod financial;
pub mod health;
pub mod integrations;
pub mod organizations;
pub mod plans;
pub mod tasks;
pub mod team;
pub mod webhooks;
