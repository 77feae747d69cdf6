//! # Task Record
//!
//! Persisted tracking entity for one dispatched remote job. A record is one-to-one
//! with its remote correlation id once the remote service has assigned one.

use super::owner::OwnerRef;
use super::task_type::{TaskParameters, TaskType};
use crate::client::{RemoteAction, RemoteJobState};
use crate::state_machine::errors::{PersistenceError, PersistenceResult};
use crate::state_machine::TaskState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Locally generated primary key of a task record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    /// Correlation id assigned by the remote service; `None` until a dispatch succeeds
    pub uuid: Option<String>,
    pub task_type: TaskType,
    pub state: TaskState,
    pub parameters: TaskParameters,
    pub owner: OwnerRef,
    /// What was (or will be) sent to the remote service, kept for redispatch
    pub remote_action: RemoteAction,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last time the remote service was successfully queried for this record
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether a bounded refresh should query the remote service again
    pub fn needs_refresh(&self, now: DateTime<Utc>, freshness: chrono::Duration) -> bool {
        if !self.state.is_in_flight() {
            return false;
        }
        match self.refreshed_at {
            Some(at) => now - at >= freshness,
            None => true,
        }
    }

    /// Apply an already-validated transition to the in-memory representation
    pub(crate) fn apply_state(&mut self, to: TaskState, result: Option<Value>, at: DateTime<Utc>) {
        if to == TaskState::Running && self.started_at.is_none() {
            self.started_at = Some(at);
        }
        if to.is_terminal() {
            if self.started_at.is_none() {
                self.started_at = Some(at);
            }
            self.finished_at = Some(at);
            self.result = result;
        }
        self.state = to;
    }
}

/// Unvalidated input for [`crate::state_machine::TaskRecordStore::create`]
#[derive(Debug, Clone, Default)]
pub struct NewTaskRecord {
    pub owner: Option<OwnerRef>,
    pub task_type: Option<TaskType>,
    pub uuid: Option<String>,
    pub initial_status: Option<RemoteJobState>,
    pub parameters: TaskParameters,
    pub remote_action: Option<RemoteAction>,
}

/// A [`NewTaskRecord`] that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedTaskRecord {
    pub owner: OwnerRef,
    pub task_type: TaskType,
    pub uuid: Option<String>,
    pub state: TaskState,
    pub parameters: TaskParameters,
    pub remote_action: RemoteAction,
}

impl NewTaskRecord {
    pub fn builder() -> NewTaskRecordBuilder {
        NewTaskRecordBuilder::default()
    }

    /// Check presence and consistency of the fields.
    ///
    /// The initial state is `waiting` when there is no handle or the handle reports
    /// a not-yet-started job, otherwise `running`.
    pub fn validate(self) -> PersistenceResult<ValidatedTaskRecord> {
        let owner = self
            .owner
            .ok_or_else(|| PersistenceError::validation("owner", "owner is required"))?;
        let task_type = self
            .task_type
            .ok_or_else(|| PersistenceError::validation("task_type", "task type is required"))?;

        if owner.kind != task_type.owner_kind() {
            return Err(PersistenceError::validation(
                "owner",
                format!(
                    "{task_type} tasks must be owned by a {}, not a {}",
                    task_type.owner_kind(),
                    owner.kind
                ),
            ));
        }

        if self.parameters.kind() != task_type.parameter_kind() {
            return Err(PersistenceError::validation(
                "parameters",
                format!("parameters do not match task type {task_type}"),
            ));
        }

        if let Some(uuid) = &self.uuid {
            if uuid.trim().is_empty() {
                return Err(PersistenceError::validation(
                    "uuid",
                    "correlation id must not be blank",
                ));
            }
        }

        let state = match (&self.uuid, self.initial_status) {
            (None, _) | (Some(_), None | Some(RemoteJobState::Waiting)) => TaskState::Waiting,
            (Some(_), Some(_)) => TaskState::Running,
        };

        let remote_action = self.remote_action.unwrap_or_else(|| RemoteAction {
            action: task_type.remote_action().to_string(),
            target: owner.to_string(),
            args: self.parameters.to_remote_args(),
        });

        Ok(ValidatedTaskRecord {
            owner,
            task_type,
            uuid: self.uuid,
            state,
            parameters: self.parameters,
            remote_action,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTaskRecordBuilder {
    inner: NewTaskRecord,
}

impl NewTaskRecordBuilder {
    pub fn owner(mut self, owner: OwnerRef) -> Self {
        self.inner.owner = Some(owner);
        self
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.inner.task_type = Some(task_type);
        self
    }

    pub fn remote_handle(mut self, uuid: impl Into<String>, status: RemoteJobState) -> Self {
        self.inner.uuid = Some(uuid.into());
        self.inner.initial_status = Some(status);
        self
    }

    pub fn parameters(mut self, parameters: TaskParameters) -> Self {
        self.inner.parameters = parameters;
        self
    }

    pub fn remote_action(mut self, action: RemoteAction) -> Self {
        self.inner.remote_action = Some(action);
        self
    }

    pub fn build(self) -> NewTaskRecord {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_params() -> TaskParameters {
        TaskParameters::Sync {
            feed_url: "http://mirror.example.com/zoo".to_string(),
        }
    }

    #[test]
    fn test_missing_owner_is_rejected() {
        let err = NewTaskRecord::builder()
            .task_type(TaskType::RepositorySync)
            .parameters(sync_params())
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Validation { ref field, .. } if field == "owner"));
    }

    #[test]
    fn test_missing_task_type_is_rejected() {
        let err = NewTaskRecord::builder()
            .owner(OwnerRef::repository(1))
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Validation { ref field, .. } if field == "task_type"));
    }

    #[test]
    fn test_owner_kind_must_match_task_type() {
        let err = NewTaskRecord::builder()
            .owner(OwnerRef::system(1))
            .task_type(TaskType::RepositorySync)
            .parameters(sync_params())
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Validation { .. }));
    }

    #[test]
    fn test_parameters_must_match_task_type() {
        let err = NewTaskRecord::builder()
            .owner(OwnerRef::system(1))
            .task_type(TaskType::ErrataInstall)
            .parameters(TaskParameters::Packages(vec!["vim".to_string()]))
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Validation { ref field, .. } if field == "parameters"));
    }

    #[test]
    fn test_initial_state_follows_handle() {
        let base = NewTaskRecord::builder()
            .owner(OwnerRef::repository(3))
            .task_type(TaskType::RepositorySync)
            .parameters(sync_params());

        let waiting = base.clone().build().validate().unwrap();
        assert_eq!(waiting.state, TaskState::Waiting);
        assert_eq!(waiting.remote_action.action, "repository.sync");

        let queued = base
            .clone()
            .remote_handle("R1", RemoteJobState::Waiting)
            .build()
            .validate()
            .unwrap();
        assert_eq!(queued.state, TaskState::Waiting);

        let started = base
            .remote_handle("R1", RemoteJobState::Running)
            .build()
            .validate()
            .unwrap();
        assert_eq!(started.state, TaskState::Running);
    }

    #[test]
    fn test_needs_refresh_only_when_in_flight_and_stale() {
        let now = Utc::now();
        let mut record = TaskRecord {
            id: TaskId(1),
            uuid: Some("R1".to_string()),
            task_type: TaskType::RepositorySync,
            state: TaskState::Running,
            parameters: sync_params(),
            owner: OwnerRef::repository(1),
            remote_action: RemoteAction::new("repository.sync", "zoo", serde_json::json!({})),
            result: None,
            created_at: now,
            started_at: Some(now),
            finished_at: None,
            refreshed_at: None,
        };
        let freshness = chrono::Duration::seconds(30);

        assert!(record.needs_refresh(now, freshness));
        record.refreshed_at = Some(now - chrono::Duration::seconds(5));
        assert!(!record.needs_refresh(now, freshness));
        record.refreshed_at = Some(now - chrono::Duration::seconds(31));
        assert!(record.needs_refresh(now, freshness));

        record.apply_state(TaskState::Success, Some(serde_json::json!({"status": "success"})), now);
        assert!(!record.needs_refresh(now, freshness));
        assert_eq!(record.finished_at, Some(now));
    }
}
