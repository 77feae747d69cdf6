//! # Configuration Loader
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path, else `KATELLO_CONFIG`, else `config/katello.toml` if present
//! 3. Environment variables, e.g. `KATELLO_REMOTE__CONTENT_SYNC_URL`

use super::error::{ConfigResult, ConfigurationError};
use super::KatelloConfig;
use crate::constants::{defaults, env};
use config::{Config, Environment, File, FileFormat};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SENSITIVE_PATTERNS: [&str; 4] = ["password", "secret", "token", "credential"];
/// Fields that are not named like secrets but embed one
const SECRET_BEARING_FIELDS: [&str; 2] = ["post_sync_url", "url"];

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: KatelloConfig,
    environment: String,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load using `KATELLO_CONFIG` or the default file location
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let explicit = std::env::var(env::CONFIG_PATH).ok().map(PathBuf::from);
        Self::load_from(explicit.as_deref())
    }

    /// Load with an explicit file; a missing explicit file is an error
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        let source = match path {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => return Err(ConfigurationError::FileNotFound(path.to_path_buf())),
            None => {
                let default = PathBuf::from(defaults::CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        let defaults = serde_json::to_string(&KatelloConfig::default()).map_err(|e| {
            ConfigurationError::invalid_value("defaults", e.to_string())
        })?;

        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Json));
        if let Some(path) = &source {
            builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(env::ENV_PREFIX)
                .prefix_separator("_")
                .separator(env::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: KatelloConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source,
        }))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: KatelloConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source: None,
        }))
    }

    pub fn config(&self) -> &KatelloConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Configuration as JSON with secrets masked
    pub fn debug_config(&self) -> Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn detect_environment() -> String {
        std::env::var(env::ENVIRONMENT).unwrap_or_else(|_| "development".to_string())
    }

    /// Log the effective configuration and missing pieces; call once logging is up
    pub fn report(&self) {
        debug!(
            "Configuration loaded: {}",
            serde_json::to_string(&self.debug_config())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %self.environment,
            source = %self.source.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".to_string()),
            bind_address = %self.config.server.bind_address,
            persistent = self.config.database.url.is_some(),
            "⚙️ Configuration loaded"
        );

        if self.config.callback.sync_token.is_none() && self.config.callback.post_sync_url.is_none() {
            warn!("No sync-completion token configured; every callback will be rejected");
        }
        for service in crate::client::RemoteService::ALL {
            if self.config.integrations.participates_in(service)
                && self.config.remote.base_url(service).is_none()
            {
                warn!(service = %service, "Integration enabled without a remote base url");
            }
        }
    }

    fn sanitize_config_for_logging(config: &KatelloConfig) -> Value {
        let mut json = serde_json::to_value(config).unwrap_or(Value::Null);
        Self::sanitize_json_recursive(&mut json);
        json
    }

    fn sanitize_json_recursive(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let sensitive = SENSITIVE_PATTERNS.iter().any(|p| key_lower.contains(p))
                        || SECRET_BEARING_FIELDS.contains(&key_lower.as_str());
                    match val {
                        Value::String(s) if sensitive => *s = mask(s),
                        other => Self::sanitize_json_recursive(other),
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(Self::sanitize_json_recursive),
            _ => {}
        }
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "[EMPTY]".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 4 {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("[MASKED: {head}***{tail}]")
    } else {
        "[MASKED: ***]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked() {
        let mut config = KatelloConfig::default();
        config.callback.sync_token = Some("supersecret".to_string());
        config.callback.post_sync_url =
            Some("https://katello.example.com/sync_complete?token=supersecret".to_string());
        config.database.url = Some("postgresql://katello:pw@db/katello".to_string());

        let sanitized = ConfigManager::sanitize_config_for_logging(&config);
        assert_eq!(sanitized["callback"]["sync_token"], "[MASKED: su***et]");
        assert!(!sanitized.to_string().contains("supersecret"));
        assert!(!sanitized.to_string().contains(":pw@"));
        assert_eq!(sanitized["server"]["bind_address"], defaults::BIND_ADDRESS);
    }

    #[test]
    fn test_short_and_empty_secrets() {
        assert_eq!(mask(""), "[EMPTY]");
        assert_eq!(mask("abc"), "[MASKED: ***]");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ConfigManager::load_from(Some(Path::new("/nonexistent/katello.toml"))).unwrap_err();
        assert!(matches!(err, ConfigurationError::FileNotFound(_)));
    }
}
