//! # Web API
//!
//! axum surface of the orchestration core: the sync-completion callback, task
//! dispatch and listing, and a health check.

pub mod auth;
pub mod callback;
pub mod errors;
pub mod handlers;
pub mod state;

pub use auth::SyncToken;
pub use callback::{terminal_state_for, CallbackAck, CallbackBody, CallbackError, CallbackIngestor};
pub use errors::{ApiError, ApiResult};
pub use state::AppState;

use crate::constants::routes;
use axum::routing::{get, post};
use axum::Router;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(handlers::health::health))
        .route(routes::SYNC_COMPLETE, post(handlers::callback::sync_complete))
        .route(routes::REPOSITORY_SYNC, post(handlers::tasks::sync_repository))
        .route(routes::SYSTEM_TASKS, get(handlers::tasks::system_tasks))
        .route(routes::PRODUCT_TASKS, get(handlers::tasks::product_tasks))
        .route(routes::REPOSITORY_TASKS, get(handlers::tasks::repository_tasks))
        .with_state(state)
}
