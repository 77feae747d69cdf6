//! Crate-level error aggregating the per-module error types

use crate::client::RemoteError;
use crate::config::ConfigurationError;
use crate::orchestration::OrchestrationError;
use crate::state_machine::PersistenceError;
use crate::web::CallbackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KatelloError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KatelloError>;
