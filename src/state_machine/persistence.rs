use super::errors::{PersistenceError, PersistenceResult};
use super::states::TaskState;
use super::task_state_machine::{TaskStateMachine, TransitionDecision};
use crate::models::{NewTaskRecord, OwnerRef, TaskId, TaskRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Result of a successful [`TaskRecordStore::transition`] call
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The record moved from `from` to `record.state`
    Applied { from: TaskState, record: TaskRecord },
    /// The record already was in the requested non-terminal state
    Unchanged(TaskRecord),
    /// The record already was in the requested terminal state with the same result
    Confirmed(TaskRecord),
}

impl TransitionOutcome {
    pub fn record(&self) -> &TaskRecord {
        match self {
            Self::Applied { record, .. } | Self::Unchanged(record) | Self::Confirmed(record) => {
                record
            }
        }
    }

    pub fn into_record(self) -> TaskRecord {
        match self {
            Self::Applied { record, .. } | Self::Unchanged(record) | Self::Confirmed(record) => {
                record
            }
        }
    }

    /// Whether this call was the one that moved the record into a terminal state
    pub fn is_terminal_application(&self) -> bool {
        matches!(self, Self::Applied { record, .. } if record.state.is_terminal())
    }
}

/// Persistence seam for task records.
///
/// Implementations guard every transition of a given record with a per-record
/// mutual exclusion (row lock or equivalent) and evaluate it through
/// [`super::TaskStateMachine`]; invalid transitions fail with
/// [`super::PersistenceError::InvalidStateTransition`] and leave the record untouched.
#[async_trait]
pub trait TaskRecordStore: Send + Sync {
    /// Validate and persist a new record
    async fn create(&self, record: NewTaskRecord) -> PersistenceResult<TaskRecord>;

    async fn find(&self, id: TaskId) -> PersistenceResult<TaskRecord>;

    async fn find_by_remote_id(&self, uuid: &str) -> PersistenceResult<TaskRecord>;

    /// Move a record forward; see [`super::TaskStateMachine::evaluate`]
    async fn transition(
        &self,
        id: TaskId,
        to: TaskState,
        result: Option<Value>,
    ) -> PersistenceResult<TransitionOutcome>;

    /// Attach the correlation id obtained by a late dispatch
    async fn attach_remote_id(&self, id: TaskId, uuid: &str) -> PersistenceResult<TaskRecord>;

    /// Record that the remote service was successfully queried at `at`
    async fn mark_refreshed(&self, id: TaskId, at: DateTime<Utc>) -> PersistenceResult<()>;

    /// All records of an owner ordered by id
    async fn list_for_owner(&self, owner: OwnerRef) -> PersistenceResult<Vec<TaskRecord>>;

    /// Up to `limit` waiting/running records, oldest first
    async fn list_in_flight(&self, limit: usize) -> PersistenceResult<Vec<TaskRecord>>;

    /// Cascade delete of an owner's records, returns how many were removed
    async fn delete_for_owner(&self, owner: OwnerRef) -> PersistenceResult<usize>;
}

/// Evaluate and apply a transition to a record the caller holds the guard for.
///
/// Shared by the store implementations so both enforce identical rules.
pub(crate) fn apply_transition(
    record: &mut TaskRecord,
    to: TaskState,
    result: Option<Value>,
    at: DateTime<Utc>,
) -> PersistenceResult<TransitionOutcome> {
    let decision = TaskStateMachine::evaluate(record.state, record.result.as_ref(), to, result.as_ref())
        .map_err(|source| PersistenceError::InvalidStateTransition {
            task_id: record.id,
            source,
        })?;

    Ok(match decision {
        TransitionDecision::Unchanged => TransitionOutcome::Unchanged(record.clone()),
        TransitionDecision::Confirmed => TransitionOutcome::Confirmed(record.clone()),
        TransitionDecision::Apply => {
            let from = record.state;
            record.apply_state(to, result, at);
            TransitionOutcome::Applied {
                from,
                record: record.clone(),
            }
        }
    })
}
