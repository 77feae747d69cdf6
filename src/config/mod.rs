//! # Configuration
//!
//! Deployment configuration for the orchestration core. Every section has
//! defaults, so an empty file (or no file at all) yields a runnable in-memory
//! deployment. See [`ConfigManager`] for the loading order.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::client::RemoteService;
use crate::constants::{defaults, SYNC_TOKEN_PARAM};
use crate::models::Integrations;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KatelloConfig {
    pub server: ServerConfig,
    pub callback: CallbackConfig,
    pub remote: RemoteConfig,
    pub refresh: RefreshConfig,
    /// Deployment-wide capability flags; entities never exceed these
    pub integrations: Integrations,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::BIND_ADDRESS.to_string(),
        }
    }
}

/// Shared secret for sync-completion callbacks.
///
/// Either set `sync_token` directly or give the `post_sync_url` handed to the
/// content-sync service; its `token` query parameter is then the secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CallbackConfig {
    pub sync_token: Option<String>,
    pub post_sync_url: Option<String>,
}

impl CallbackConfig {
    /// The configured secret; an empty or missing secret rejects every callback
    pub fn resolved_token(&self) -> ConfigResult<String> {
        if let Some(token) = self.sync_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }

        match self.post_sync_url.as_deref() {
            Some(raw) => {
                let url = Url::parse(raw).map_err(|e| {
                    ConfigurationError::invalid_value("callback.post_sync_url", e.to_string())
                })?;
                url.query_pairs()
                    .find(|(key, _)| key == SYNC_TOKEN_PARAM)
                    .map(|(_, value)| value.into_owned())
                    .ok_or_else(|| {
                        ConfigurationError::MissingField(format!(
                            "callback.post_sync_url query parameter '{SYNC_TOKEN_PARAM}'"
                        ))
                    })
            }
            None => Ok(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub content_sync_url: Option<String>,
    pub entitlement_url: Option<String>,
    pub indexing_url: Option<String>,
    pub dispatch_timeout_ms: u64,
    pub query_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            content_sync_url: None,
            entitlement_url: None,
            indexing_url: None,
            dispatch_timeout_ms: defaults::DISPATCH_TIMEOUT_MS,
            query_timeout_ms: defaults::QUERY_TIMEOUT_MS,
        }
    }
}

impl RemoteConfig {
    pub fn base_url(&self, service: RemoteService) -> Option<&str> {
        match service {
            RemoteService::ContentSync => self.content_sync_url.as_deref(),
            RemoteService::Entitlement => self.entitlement_url.as_deref(),
            RemoteService::Indexing => self.indexing_url.as_deref(),
        }
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Records refreshed more recently than this are served as-is
    pub freshness_secs: u64,
    /// Concurrent remote queries per refresh batch
    pub concurrency: usize,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            freshness_secs: defaults::FRESHNESS_SECS,
            concurrency: defaults::REFRESH_CONCURRENCY,
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
            sweep_batch_size: defaults::SWEEP_BATCH_SIZE,
        }
    }
}

impl RefreshConfig {
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.freshness_secs).unwrap_or(i64::MAX))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL url; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: defaults::DATABASE_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl KatelloConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.bind_address.parse::<SocketAddr>().map_err(|e| {
            ConfigurationError::invalid_value("server.bind_address", e.to_string())
        })?;

        self.callback.resolved_token()?;

        for service in RemoteService::ALL {
            if let Some(raw) = self.remote.base_url(service) {
                Url::parse(raw).map_err(|e| {
                    ConfigurationError::invalid_value(format!("remote.{service}_url"), e.to_string())
                })?;
            }
        }

        let positive = [
            ("remote.dispatch_timeout_ms", self.remote.dispatch_timeout_ms),
            ("remote.query_timeout_ms", self.remote.query_timeout_ms),
            ("refresh.sweep_interval_secs", self.refresh.sweep_interval_secs),
            ("refresh.concurrency", self.refresh.concurrency as u64),
            ("refresh.sweep_batch_size", self.refresh.sweep_batch_size as u64),
            ("database.max_connections", u64::from(self.database.max_connections)),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigurationError::invalid_value(*field, "must be greater than zero"));
        }

        if self.database.url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "database.url",
                "must not be blank; omit it to use the in-memory store",
            ));
        }

        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .map_err(|e| ConfigurationError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KatelloConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.bind_address, defaults::BIND_ADDRESS);
        assert_eq!(config.integrations, Integrations::all());
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_token_from_post_sync_url() {
        let callback = CallbackConfig {
            sync_token: None,
            post_sync_url: Some(
                "https://katello.example.com/api/v2/repositories/sync_complete?token=s3cr3t".to_string(),
            ),
        };
        assert_eq!(callback.resolved_token().unwrap(), "s3cr3t");

        let explicit = CallbackConfig {
            sync_token: Some("direct".to_string()),
            ..callback
        };
        assert_eq!(explicit.resolved_token().unwrap(), "direct");
    }

    #[test]
    fn test_post_sync_url_without_token() {
        let callback = CallbackConfig {
            sync_token: None,
            post_sync_url: Some("https://katello.example.com/sync_complete".to_string()),
        };
        assert!(matches!(
            callback.resolved_token(),
            Err(ConfigurationError::MissingField(_))
        ));
    }

    #[test]
    fn test_missing_token_resolves_empty() {
        assert_eq!(CallbackConfig::default().resolved_token().unwrap(), "");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = KatelloConfig::default();
        config.refresh.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "refresh.concurrency"
        ));

        let mut config = KatelloConfig::default();
        config.server.bind_address = "localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = KatelloConfig::default();
        config.remote.content_sync_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}
