//! Configuration management for the credential proxy.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `3001`.
//! - `TOKEN_STORE` - Optional. `memory` or `sqlite`. Defaults to `sqlite`.
//!   `memory` starts empty and nothing can write to it, so it is only useful in tests.
//! - `TOKEN_DB_PATH` - Optional. SQLite database holding OAuth tokens. Defaults to `./data/oauth_tokens.db`.
//! - `TOKEN_STORE_TIMEOUT_SECS` - Optional. Token lookup timeout. Defaults to `5`.
//! - `UPSTREAM_TIMEOUT_SECS` - Optional. Timeout for calls to n8n. Defaults to `30`.
//! - `GOOGLE_CLIENT_ID` - Optional. Default `clientId` for Google credential types.
//! - `GOOGLE_CLIENT_SECRET` - Optional. Default `clientSecret` for Google credential types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::credentials::ProviderSecrets;
use crate::token_store::TokenStoreType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Token store configuration.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    /// Which backend holds the OAuth tokens
    pub store_type: TokenStoreType,

    /// SQLite database path (ignored by the memory backend)
    pub db_path: PathBuf,

    /// Upper bound on a single token lookup
    pub timeout: Duration,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            store_type: TokenStoreType::default(),
            db_path: PathBuf::from("./data/oauth_tokens.db"),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Timeout applied to every call to the n8n API
    pub upstream_timeout: Duration,

    /// OAuth token storage
    pub token_store: TokenStoreConfig,

    /// Default OAuth client secrets per provider
    pub provider_secrets: ProviderSecrets,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse
    /// or a timeout is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let upstream_timeout = timeout_from_env("UPSTREAM_TIMEOUT_SECS", 30)?;

        let token_store = TokenStoreConfig {
            store_type: std::env::var("TOKEN_STORE")
                .map(|v| TokenStoreType::from_str(&v))
                .unwrap_or_default(),
            db_path: std::env::var("TOKEN_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/oauth_tokens.db")),
            timeout: timeout_from_env("TOKEN_STORE_TIMEOUT_SECS", 5)?,
        };

        let provider_secrets = ProviderSecrets::from_lookup(|name| std::env::var(name).ok());

        Ok(Self {
            host,
            port,
            upstream_timeout,
            token_store,
            provider_secrets,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(token_store: TokenStoreConfig, provider_secrets: ProviderSecrets) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            upstream_timeout: Duration::from_secs(30),
            token_store,
            provider_secrets,
        }
    }
}

fn timeout_from_env(name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    let raw = match std::env::var(name) {
        Ok(value) => value,
        Err(_) => return Ok(Duration::from_secs(default_secs)),
    };
    parse_timeout_secs(name, &raw)
}

fn parse_timeout_secs(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
