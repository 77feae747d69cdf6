use crate::client::{RemoteError, RemoteService};
use crate::models::{OwnerRef, TaskType};
use crate::state_machine::PersistenceError;
use thiserror::Error;

/// A dispatch precondition that failed before any remote call was made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{owner} does not participate in the {service} integration")]
    IntegrationDisabled {
        owner: OwnerRef,
        service: RemoteService,
    },

    #[error("Repository {owner} has no feed url configured")]
    MissingFeedUrl { owner: OwnerRef },

    #[error("{task_type} requires at least one {item}")]
    EmptyList { task_type: TaskType, item: &'static str },

    #[error("Product {owner} has no syncable repositories")]
    NoSyncableRepositories { owner: OwnerRef },

    #[error("{task_type} cannot be requested for {owner}")]
    WrongOwnerKind { owner: OwnerRef, task_type: TaskType },
}

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Remote service rejected the action: {0}")]
    RemoteRejected(RemoteError),

    #[error("Owner not found: {0}")]
    OwnerNotFound(OwnerRef),

    #[error("No remote client configured for the {service} service")]
    MissingClient { service: RemoteService },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
