//! # Bounded Refresh
//!
//! Re-queries the remote services for a batch of in-flight records. Each id gets
//! its own outcome; one failing query never fails the batch.

use super::orchestrator::TaskOrchestrator;
use crate::client::{RemoteError, RemoteService};
use crate::constants::events;
use crate::models::{TaskId, TaskRecord};
use crate::state_machine::{TaskState, TransitionOutcome};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{debug, info, warn};

/// What refreshing a single record did
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The record moved forward
    Advanced { from: TaskState, to: TaskState },
    /// The remote service reports nothing new
    Unchanged,
    /// A record without correlation id was dispatched again and got one
    Redispatched { correlation_id: String },
    /// The remote job is gone; the record moved to `error`
    Lost,
    /// The record is no longer in flight or no longer exists
    Skipped,
    /// The record was left untouched
    Failed(RefreshFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshFailure {
    Remote(RemoteError),
    MissingClient(RemoteService),
    Persistence(String),
}

impl std::fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(e) => write!(f, "{e}"),
            Self::MissingClient(service) => write!(f, "no client for {service}"),
            Self::Persistence(reason) => write!(f, "persistence: {reason}"),
        }
    }
}

/// Per-id outcomes of one [`TaskOrchestrator::refresh_batch`] call, ordered by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub outcomes: Vec<(TaskId, RefreshOutcome)>,
}

impl RefreshReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome(&self, id: TaskId) -> Option<&RefreshOutcome> {
        self.outcomes
            .iter()
            .find(|(task_id, _)| *task_id == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn advanced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    RefreshOutcome::Advanced { .. } | RefreshOutcome::Lost | RefreshOutcome::Redispatched { .. }
                )
            })
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (TaskId, &RefreshFailure)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            RefreshOutcome::Failed(failure) => Some((*id, failure)),
            _ => None,
        })
    }
}

impl TaskOrchestrator {
    /// Refresh every id concurrently, bounded by the configured concurrency
    pub async fn refresh_batch(&self, ids: &[TaskId]) -> RefreshReport {
        let mut outcomes: Vec<(TaskId, RefreshOutcome)> = stream::iter(ids.iter().copied())
            .map(|id| async move { (id, self.refresh_one(id).await) })
            .buffer_unordered(self.settings().refresh_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(id, _)| *id);

        for (id, outcome) in &outcomes {
            if let RefreshOutcome::Failed(failure) = outcome {
                debug!(task_id = %id, failure = %failure, "Refresh left task unchanged");
            }
        }

        RefreshReport { outcomes }
    }

    async fn refresh_one(&self, id: TaskId) -> RefreshOutcome {
        let record = match self.store().find(id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return RefreshOutcome::Skipped,
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string())),
        };
        if !record.state.is_in_flight() {
            return RefreshOutcome::Skipped;
        }

        match record.uuid.clone() {
            Some(uuid) => self.poll(&record, &uuid).await,
            None => self.redispatch(&record).await,
        }
    }

    async fn poll(&self, record: &TaskRecord, uuid: &str) -> RefreshOutcome {
        let service = record.task_type.service();
        let Ok(client) = self.client_for(record.task_type) else {
            return RefreshOutcome::Failed(RefreshFailure::MissingClient(service));
        };

        let queried = match tokio::time::timeout(self.settings().query_timeout, client.query(uuid)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout { service }),
        };

        let status = match queried {
            Ok(status) => status,
            Err(RemoteError::NotFound { .. }) => {
                warn!(task_id = %record.id, correlation_id = %uuid, "Remote job not found, marking task as error");
                let result = json!({ "error": "remote job not found", "correlation_id": uuid });
                return match self.apply_transition(record.id, TaskState::Error, Some(result)).await {
                    Ok(Some(TransitionOutcome::Applied { .. })) => RefreshOutcome::Lost,
                    Ok(_) => RefreshOutcome::Unchanged,
                    Err(e) => RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string())),
                };
            }
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::Remote(e)),
        };

        if let Err(e) = self.store().mark_refreshed(record.id, Utc::now()).await {
            return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string()));
        }

        let to = status.state.to_task_state();
        // A remote lagging behind our state is not a regression
        if to.rank() <= record.state.rank() {
            return RefreshOutcome::Unchanged;
        }
        self.advance(record, to, status.result).await
    }

    async fn redispatch(&self, record: &TaskRecord) -> RefreshOutcome {
        let Some(_claim) = self.claim_redispatch(record.id) else {
            debug!(task_id = %record.id, "Deferred dispatch already in progress");
            return RefreshOutcome::Unchanged;
        };
        // Another refresh may have attached an id between our read and the claim
        let record = &match self.store().find(record.id).await {
            Ok(current) if current.uuid.is_none() && current.state.is_in_flight() => current,
            Ok(_) => return RefreshOutcome::Unchanged,
            Err(e) if e.is_not_found() => return RefreshOutcome::Skipped,
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string())),
        };

        let service = record.task_type.service();
        let Ok(client) = self.client_for(record.task_type) else {
            return RefreshOutcome::Failed(RefreshFailure::MissingClient(service));
        };

        match self.dispatch_with_timeout(client.as_ref(), &record.remote_action).await {
            Ok(handle) => {
                if let Err(e) = self.store().attach_remote_id(record.id, &handle.correlation_id).await {
                    return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string()));
                }
                info!(
                    event = events::TASK_REDISPATCHED,
                    task_id = %record.id,
                    correlation_id = %handle.correlation_id,
                    "🔁 Deferred task dispatched"
                );

                let to = handle.initial_status.to_task_state();
                if to != record.state {
                    if let Err(e) = self.apply_transition(record.id, to, handle.result).await {
                        return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string()));
                    }
                }
                if let Err(e) = self.store().mark_refreshed(record.id, Utc::now()).await {
                    return RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string()));
                }
                RefreshOutcome::Redispatched {
                    correlation_id: handle.correlation_id,
                }
            }
            Err(e @ RemoteError::Rejected { .. }) => {
                warn!(task_id = %record.id, error = %e, "Deferred dispatch rejected, marking task as error");
                let result = json!({ "error": e.to_string(), "stage": "dispatch" });
                self.advance(record, TaskState::Error, Some(result)).await
            }
            Err(e) => RefreshOutcome::Failed(RefreshFailure::Remote(e)),
        }
    }

    async fn advance(
        &self,
        record: &TaskRecord,
        to: TaskState,
        result: Option<serde_json::Value>,
    ) -> RefreshOutcome {
        match self.apply_transition(record.id, to, result).await {
            Ok(Some(TransitionOutcome::Applied { from, record })) => RefreshOutcome::Advanced {
                from,
                to: record.state,
            },
            Ok(_) => RefreshOutcome::Unchanged,
            Err(e) => RefreshOutcome::Failed(RefreshFailure::Persistence(e.to_string())),
        }
    }
}
