/// Database models for Atrio
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `plan`: Subscription tiers with caps and feature flags
/// - `organization`: Tenant accounts with plan assignment and override caps
/// - `user`: User accounts with a closed role enum
/// - `client`: Agency clients, scoped to an organization
/// - `task`: Work items, scoped to an organization
/// - `financial`: Financial records (invoices, payments, contracts)
/// - `activity`: Append-only activity log (feeds usage metering)
/// - `ai_strategy`: Generated marketing strategies
/// - `integration`: Marketing platform connections
/// - `webhook_event`: Durable inbox for payment-processor callbacks

pub mod activity;
pub mod ai_strategy;
pub mod client;
pub mod financial;
pub mod integration;
pub mod organization;
pub mod plan;
pub mod task;
pub mod user;
pub mod webhook_event;
