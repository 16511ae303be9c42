use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

use crate::core::{AppError, Result};

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stripe: StripeConfig,
    pub payments: PaymentsConfig,
    pub notifications: NotificationsConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Escrow policy knobs
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Flat fee authorized when a diagnostic visit is booked
    pub diagnostic_fee: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Fire-and-forget event sink; events are only traced when unset
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            stripe: StripeConfig {
                api_key: env::var("STRIPE_API_KEY")
                    .map_err(|_| AppError::Configuration("STRIPE_API_KEY not set".to_string()))?,
                base_url: env::var("STRIPE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            },
            payments: PaymentsConfig {
                diagnostic_fee: env::var("DIAGNOSTIC_FEE_USD")
                    .unwrap_or_else(|_| "85.00".to_string())
                    .parse::<Decimal>()
                    .map_err(|_| {
                        AppError::Configuration("Invalid DIAGNOSTIC_FEE_USD".to_string())
                    })?,
            },
            notifications: NotificationsConfig {
                webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            },
            security: SecurityConfig {
                rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid RATE_LIMIT_PER_MINUTE".to_string())
                    })?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.payments.diagnostic_fee <= Decimal::ZERO {
            return Err(AppError::Configuration(
                "Diagnostic fee must be greater than 0".to_string(),
            ));
        }

        if self.payments.diagnostic_fee.scale() > crate::core::money::USD_SCALE {
            return Err(AppError::Configuration(
                "Diagnostic fee must have at most 2 decimal places".to_string(),
            ));
        }

        if self.security.rate_limit_per_minute == 0 {
            return Err(AppError::Configuration(
                "Rate limit must be greater than 0".to_string(),
            ));
        }

        if self.stripe.api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "STRIPE_API_KEY must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn test_config() -> Config {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                log_level: "debug".to_string(),
            },
            database: DatabaseConfig {
                url: "mysql://localhost/homefix_test".to_string(),
                min_connections: 1,
                max_connections: 2,
                acquire_timeout_secs: 5,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: 1,
            },
            stripe: StripeConfig {
                api_key: "sk_test_123".to_string(),
                base_url: "https://api.stripe.com".to_string(),
            },
            payments: PaymentsConfig {
                diagnostic_fee: Decimal::from_str("85.00").unwrap(),
            },
            notifications: NotificationsConfig { webhook_url: None },
            security: SecurityConfig {
                rate_limit_per_minute: 600,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_zero_diagnostic_fee_rejected() {
        let mut config = test_config();
        config.payments.diagnostic_fee = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sub_cent_diagnostic_fee_rejected() {
        let mut config = test_config();
        config.payments.diagnostic_fee = Decimal::from_str("85.005").unwrap();
        assert!(config.validate().is_err());
    }
}
