use crate::models::TaskId;
use crate::state_machine::TaskState;
use thiserror::Error;

/// Errors raised while evaluating a requested state change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: TaskState, to: TaskState },

    #[error("Task already {state} with a different result")]
    ConflictingResult { state: TaskState },
}

/// Errors raised by task record stores
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Validation failed on {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Task record not found: {lookup}")]
    NotFound { lookup: String },

    #[error("A task record already exists for correlation id {uuid}")]
    DuplicateCorrelationId { uuid: String },

    #[error("Invalid state transition for task {task_id}: {source}")]
    InvalidStateTransition {
        task_id: TaskId,
        #[source]
        source: StateMachineError,
    },

    #[error("Corrupt task record {task_id}: {reason}")]
    Corrupt { task_id: TaskId, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(lookup: impl Into<String>) -> Self {
        Self::NotFound {
            lookup: lookup.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;
