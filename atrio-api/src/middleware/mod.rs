/// HTTP middleware for the API server
///
/// - `security`: security-related response headers
/// - `organization`: tenant-access and feature-entitlement gates

pub mod organization;
pub mod security;
