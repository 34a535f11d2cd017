//! Process configuration loaded from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;

/// Errors raised while reading the process configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },

    /// A variable is present but unparsable.
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn missing(name: &'static str) -> Self {
        Self::Missing { name }
    }

    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            message: message.into(),
        }
    }
}

/// Application configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection string for the record store.
    pub database_url: String,
    /// Base URL of the search index HTTP API.
    pub search_url: Url,
    /// Per-request timeout for search index calls.
    pub search_timeout: Duration,
    /// Number of background index workers.
    pub index_workers: usize,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// `DATABASE_URL` is required; everything else has a local-development
    /// default: `BIND_ADDR` 0.0.0.0:8080, `SEARCH_URL`
    /// http://localhost:9200, `SEARCH_TIMEOUT_SECONDS` 30, `INDEX_WORKERS` 4.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::missing("DATABASE_URL"))?;

        let bind_addr = match std::env::var("BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| ConfigError::invalid("BIND_ADDR", format!("{err}")))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let search_url = std::env::var("SEARCH_URL")
            .unwrap_or_else(|_| "http://localhost:9200".to_owned());
        let search_url = Url::parse(&search_url)
            .map_err(|err| ConfigError::invalid("SEARCH_URL", format!("{err}")))?;

        let search_timeout = match std::env::var("SEARCH_TIMEOUT_SECONDS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|err| {
                        ConfigError::invalid("SEARCH_TIMEOUT_SECONDS", format!("{err}"))
                    })?,
            ),
            Err(_) => Duration::from_secs(30),
        };

        let index_workers = match std::env::var("INDEX_WORKERS") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| ConfigError::invalid("INDEX_WORKERS", format!("{err}")))?,
            Err(_) => 4,
        };

        Ok(Self {
            bind_addr,
            database_url,
            search_url,
            search_timeout,
            index_workers,
        })
    }
}
