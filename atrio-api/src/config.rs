/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: `*`)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 bytes (required)
/// - `STRIPE_SECRET_KEY`: Payment processor API key (optional)
/// - `STRIPE_WEBHOOK_SECRET`: Shared secret for webhook signature checks (optional)
/// - `STRIPE_API_BASE`: Override processor base URL (default: https://api.stripe.com)
/// - `PAGSEGURO_API_BASE`: Override PagSeguro base URL
/// - `OPENAI_API_KEY`: Completion API key (optional; AI routes fail upstream without it)
/// - `OPENAI_API_BASE`: Override completion API base URL (default: https://api.openai.com)
/// - `OPENAI_MODEL`: Completion model (default: gpt-4o)
/// - `RUST_LOG`: Log filter (default: info)
///
/// # Example
///
/// ```no_run
/// use atrio_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Payment processor configuration
    pub billing: BillingConfig,

    /// AI completion API configuration
    pub ai: AiConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` means permissive)
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, strict CORS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Payment processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Stripe secret API key (empty disables real calls)
    pub stripe_secret_key: String,

    /// Shared secret for webhook signature verification
    ///
    /// When unset, webhook signatures are not checked.
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL
    pub stripe_api_base: String,

    /// PagSeguro API base URL
    pub pagseguro_api_base: String,
}

/// AI completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Completion API key
    pub api_key: String,

    /// Completion API base URL
    pub api_base: String,

    /// Model identifier
    pub model: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// have invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("PRODUCTION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            billing: BillingConfig {
                stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
                stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
                stripe_api_base: env::var("STRIPE_API_BASE")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
                pagseguro_api_base: env::var("PAGSEGURO_API_BASE")
                    .unwrap_or_else(|_| "https://ws.pagseguro.uol.com.br".to_string()),
            },
            ai: AiConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/atrio_test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            billing: BillingConfig {
                stripe_secret_key: String::new(),
                stripe_webhook_secret: None,
                stripe_api_base: "https://api.stripe.com".to_string(),
                pagseguro_api_base: "https://ws.pagseguro.uol.com.br".to_string(),
            },
            ai: AiConfig {
                api_key: String::new(),
                api_base: "https://api.openai.com".to_string(),
                model: "gpt-4o".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address() {
        let config = test_config();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_webhook_secret_optional() {
        let config = test_config();
        assert!(config.billing.stripe_webhook_secret.is_none());
    }
}
