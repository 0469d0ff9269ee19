//! Environment-variable configuration, collected once at process startup.

use std::env;

use crate::domain::EngineError;

const DEFAULT_CONVERSION_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub test_database_url: Option<String>,
    pub sync_driver: String,
    pub async_driver: String,
    pub server_hostname: String,
    pub conversion_cache_ttl_secs: i64,
    pub webhook_decryption_key: Option<String>,
}

impl Config {
    /// Reads every setting from the environment. Fails closed on a missing
    /// `DATABASE_URL` — there is no usable default for it.
    pub fn from_env() -> Result<Self, EngineError> {
        let database_url = required("DATABASE_URL")?;
        let test_database_url = env::var("TEST_DATABASE_URL").ok();
        let sync_driver = env::var("SYNC_DRIVER").unwrap_or_else(|_| "postgresql".to_string());
        let async_driver = env::var("ASYNC_DRIVER").unwrap_or_else(|_| "postgresql+asyncpg".to_string());
        let server_hostname = env::var("SERVER_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let conversion_cache_ttl_secs = env::var("CONVERSION_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONVERSION_CACHE_TTL_SECS);
        let webhook_decryption_key = env::var("WEBHOOK_DECRYPTION_KEY").ok();

        Ok(Self {
            database_url,
            test_database_url,
            sync_driver,
            async_driver,
            server_hostname,
            conversion_cache_ttl_secs,
            webhook_decryption_key,
        })
    }
}

fn required(key: &str) -> Result<String, EngineError> {
    env::var(key).map_err(|_| EngineError::Internal(format!("missing required environment variable: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_reports_the_missing_key_by_name() {
        let err = required("THIS_VAR_DOES_NOT_EXIST_12345").unwrap_err();
        assert!(err.to_string().contains("THIS_VAR_DOES_NOT_EXIST_12345"));
    }
}
