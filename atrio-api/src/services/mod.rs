/// External-service clients and business services
///
/// - `period`: reporting period buckets and their date windows
/// - `payments`: payment-processor clients (Stripe-style REST, PagSeguro)
/// - `ai`: completion API client for strategy generation
/// - `billing`: subscriptions, plan changes, usage analytics, webhook apply

pub mod ai;
pub mod billing;
pub mod payments;
pub mod period;
