//! Configuration for commerce-service.

use anyhow::anyhow;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Invoice numbering settings. `INV-000001` with the defaults.
#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub number_prefix: String,
    pub number_pad_width: usize,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    pub common: CoreConfig,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub invoicing: InvoicingConfig,
}

fn get_env(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::ConfigError(anyhow!("{} is not a valid value", name))),
        Err(_) => Ok(default),
    }
}

impl CommerceConfig {
    /// Load configuration from the environment, with development defaults.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            common: CoreConfig {
                port: get_env_parsed("PORT", 8080)?,
            },
            service_name: get_env("SERVICE_NAME", "commerce-service"),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", "info"),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", "sqlite://commerce.db"),
                max_connections: get_env_parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: get_env_parsed("DATABASE_MIN_CONNECTIONS", 1)?,
            },
            invoicing: InvoicingConfig {
                number_prefix: get_env("INVOICE_NUMBER_PREFIX", "INV"),
                number_pad_width: get_env_parsed("INVOICE_NUMBER_PAD_WIDTH", 6)?,
            },
        })
    }
}
