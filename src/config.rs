use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// No URL means the in-memory store.
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    pub notify_webhook_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("PORT", "8081")?,
            database_url: optional("DATABASE_URL"),
            max_db_connections: try_load("MAX_DB_CONNECTIONS", "5")?,
            notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
            request_timeout_secs: try_load("REQUEST_TIMEOUT_SECS", "30")?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid {key}={raw:?}: {e}")
    })
}
