//! API server configuration.

use std::path::PathBuf;
use std::time::Duration;

use feelslike_core::auth::password::DEFAULT_BCRYPT_COST;
use feelslike_core::auth::token::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, TokenConfig};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid duration '{value}': {source}")]
    Duration {
        var: &'static str,
        value: String,
        source: humantime::DurationError,
    },

    #[error("{var}: invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Token signing secret, algorithm and lifetimes.
    pub tokens: TokenConfig,
    /// Audience (OAuth client ID) expected in federated credentials.
    pub google_client_id: String,
    /// Directory uploaded media is written to and served from.
    pub uploads_dir: PathBuf,
    /// bcrypt cost factor for new password hashes.
    pub bcrypt_cost: u32,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                | Default                                   |
    /// |-------------------------|-------------------------------------------|
    /// | `BIND_ADDR`             | `127.0.0.1:3000`                          |
    /// | `DATABASE_URL`          | `postgres://localhost:5432/feelslike`     |
    /// | `TOKEN_SECRET`          | random per process (warns)                |
    /// | `TOKEN_ALGORITHM`       | `HS256`                                   |
    /// | `TOKEN_EXPIRES`         | `1h`                                      |
    /// | `REFRESH_TOKEN_EXPIRES` | `7d`                                      |
    /// | `GOOGLE_CLIENT_ID`      | empty (federated login always fails)      |
    /// | `UPLOADS_DIR`           | `uploads`                                 |
    /// | `BCRYPT_COST`           | `10`                                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let algorithm = env_or("TOKEN_ALGORITHM", "HS256");
        let tokens = TokenConfig::new(resolve_token_secret())
            .with_algorithm_name(&algorithm)
            .map_err(|_| ConfigError::Invalid {
                var: "TOKEN_ALGORITHM",
                value: algorithm.clone(),
            })?
            .with_access_ttl(env_duration("TOKEN_EXPIRES", DEFAULT_ACCESS_TTL)?)
            .with_refresh_ttl(env_duration("REFRESH_TOKEN_EXPIRES", DEFAULT_REFRESH_TTL)?);

        let bcrypt_cost = match std::env::var("BCRYPT_COST") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid {
                var: "BCRYPT_COST",
                value: v.clone(),
            })?,
            Err(_) => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:3000"),
            pg_connection_url: env_or("DATABASE_URL", "postgres://localhost:5432/feelslike"),
            tokens,
            google_client_id: env_or("GOOGLE_CLIENT_ID", ""),
            uploads_dir: PathBuf::from(env_or("UPLOADS_DIR", "uploads")),
            bcrypt_cost,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.into())
}

/// Parse a human duration such as `1h`, `30m` or `7d`.
fn env_duration(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => humantime::parse_duration(&value).map_err(|source| ConfigError::Duration {
            var,
            value,
            source,
        }),
        Err(_) => Ok(default),
    }
}

/// `TOKEN_SECRET`, or a random secret that invalidates all tokens on restart.
fn resolve_token_secret() -> String {
    if let Ok(secret) = std::env::var("TOKEN_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    warn!("TOKEN_SECRET not set; using a random secret for this process");
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
