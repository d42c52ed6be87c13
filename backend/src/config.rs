use std::time::Duration;

use anyhow::{bail, Context};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub quote_cache_ttl: Duration,
    pub provider_timeout: Duration,
    pub valuation_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            port: env_or("PORT", 5000),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            quote_cache_ttl: Duration::from_secs(env_or("QUOTE_CACHE_TTL_SECS", 60)),
            provider_timeout: Duration::from_secs(env_or("PROVIDER_TIMEOUT_SECS", 10)),
            valuation_concurrency: env_or("VALUATION_CONCURRENCY", 8),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if self.quote_cache_ttl.is_zero() {
            bail!("QUOTE_CACHE_TTL_SECS must be greater than 0");
        }
        if self.provider_timeout.is_zero() {
            bail!("PROVIDER_TIMEOUT_SECS must be greater than 0");
        }
        if self.valuation_concurrency == 0 {
            bail!("VALUATION_CONCURRENCY must be greater than 0");
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/stockfolio".into(),
            jwt_secret: "secret".into(),
            port: 5000,
            db_max_connections: 10,
            quote_cache_ttl: Duration::from_secs(60),
            provider_timeout: Duration::from_secs(10),
            valuation_concurrency: 8,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut c = config();
        c.quote_cache_ttl = Duration::ZERO;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_blank_secret_rejected() {
        let mut c = config();
        c.jwt_secret = "  ".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_unparseable_value_uses_default() {
        assert_eq!(env_or("STOCKFOLIO_TEST_UNSET_VAR", 42u16), 42);
    }
}
