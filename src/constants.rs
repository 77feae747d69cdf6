//! # System Constants
//!
//! Names shared between the orchestration core, the web surface and the
//! deployment configuration.

/// Lifecycle event names emitted in structured logs
pub mod events {
    pub const TASK_DISPATCHED: &str = "task.dispatched";
    pub const TASK_DISPATCH_DEFERRED: &str = "task.dispatch_deferred";
    pub const TASK_REDISPATCHED: &str = "task.redispatched";
    pub const TASK_TRANSITIONED: &str = "task.transitioned";
    pub const TASK_CONFIRMED: &str = "task.confirmed";
    pub const TASK_TRANSITION_IGNORED: &str = "task.transition_ignored";
    pub const TASK_CANCELLED: &str = "task.cancelled";
    pub const CALLBACK_RECEIVED: &str = "callback.received";
    pub const CALLBACK_REJECTED: &str = "callback.rejected";
}

/// Environment variables recognised by the loader and the binary
pub mod env {
    pub const CONFIG_PATH: &str = "KATELLO_CONFIG";
    pub const ENV_PREFIX: &str = "KATELLO";
    pub const ENV_SEPARATOR: &str = "__";
    pub const ENVIRONMENT: &str = "KATELLO_ENV";
}

/// Defaults used when no configuration overrides them
pub mod defaults {
    pub const CONFIG_FILE: &str = "config/katello.toml";
    pub const BIND_ADDRESS: &str = "127.0.0.1:3000";
    pub const DISPATCH_TIMEOUT_MS: u64 = 10_000;
    pub const QUERY_TIMEOUT_MS: u64 = 5_000;
    pub const FRESHNESS_SECS: u64 = 30;
    pub const REFRESH_CONCURRENCY: usize = 8;
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
    pub const SWEEP_BATCH_SIZE: usize = 500;
    pub const DATABASE_MAX_CONNECTIONS: u32 = 10;
    pub const LOG_LEVEL: &str = "info";
}

/// HTTP routes served by [`crate::web`]
pub mod routes {
    pub const SYNC_COMPLETE: &str = "/api/v2/repositories/sync_complete";
    pub const REPOSITORY_SYNC: &str = "/api/v2/repositories/{id}/sync";
    pub const SYSTEM_TASKS: &str = "/api/v2/systems/{id}/tasks";
    pub const PRODUCT_TASKS: &str = "/api/v2/products/{id}/tasks";
    pub const REPOSITORY_TASKS: &str = "/api/v2/repositories/{id}/tasks";
    pub const HEALTH: &str = "/health";
}

/// Query parameter carrying the shared sync-completion secret
pub const SYNC_TOKEN_PARAM: &str = "token";

/// Tracing target for security-relevant events
pub const SECURITY_LOG_TARGET: &str = "katello::security";
