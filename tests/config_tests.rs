//! Layered configuration loading: defaults, TOML file, environment

use katello_tasks::config::{ConfigManager, ConfigurationError};
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_overrides_defaults() {
    let file = write_config(
        r#"
[server]
bind_address = "0.0.0.0:8443"

[callback]
post_sync_url = "https://katello.example.com/api/v2/repositories/sync_complete?token=abc123"

[remote]
content_sync_url = "https://pulp.example.com/pulp/api/v2/"

[integrations]
indexing = false
"#,
    );

    let manager = ConfigManager::load_from(Some(file.path())).unwrap();
    let config = manager.config();
    assert_eq!(config.server.bind_address, "0.0.0.0:8443");
    assert_eq!(config.callback.resolved_token().unwrap(), "abc123");
    assert_eq!(
        config.remote.content_sync_url.as_deref(),
        Some("https://pulp.example.com/pulp/api/v2/")
    );
    assert!(!config.integrations.indexing);
    assert!(config.integrations.content_sync);
    assert_eq!(config.remote.query_timeout_ms, 5_000);
    assert_eq!(manager.source(), Some(file.path()));

    let debug = manager.debug_config().to_string();
    assert!(!debug.contains("abc123"));
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let file = write_config(
        r#"
[refresh]
sweep_batch_size = 0
"#,
    );
    let err = ConfigManager::load_from(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));

    let file = write_config("[database]\nmax_connections = \"many\"\n");
    let err = ConfigManager::load_from(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigurationError::Load(_)));
}

/// Only touches keys the other tests in this binary never assert on
#[test]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
[logging]
level = "debug"

[refresh]
freshness_secs = 10
"#,
    );
    std::env::set_var("KATELLO_REFRESH__FRESHNESS_SECS", "45");
    std::env::set_var("KATELLO_REMOTE__DISPATCH_TIMEOUT_MS", "2500");

    let manager = ConfigManager::load_from(Some(file.path()));

    std::env::remove_var("KATELLO_REFRESH__FRESHNESS_SECS");
    std::env::remove_var("KATELLO_REMOTE__DISPATCH_TIMEOUT_MS");

    let manager = manager.unwrap();
    assert_eq!(manager.config().refresh.freshness_secs, 45);
    assert_eq!(manager.config().logging.level, "debug");
    assert_eq!(manager.config().remote.dispatch_timeout_ms, 2_500);
}
