//! # Task Orchestrator
//!
//! Wraps a domain operation into dispatch plus record creation, serves the
//! refreshed task list of an owner and applies every state change through the
//! store so terminal side effects fire exactly once.

use super::errors::{OrchestrationError, OrchestrationResult, PreconditionError};
use super::guards::{standard_guards, DispatchContext, DispatchGuard};
use crate::client::{RemoteAction, RemoteActionClient, RemoteClients, RemoteError, RemoteHandle};
use crate::config::KatelloConfig;
use crate::constants::events;
use crate::logging::log_task_operation;
use crate::models::{NewTaskRecord, OwnerRef, TaskId, TaskParameters, TaskRecord, TaskType};
use crate::registry::{HookRegistry, OwnerRegistry, TerminalNotice};
use crate::state_machine::{PersistenceError, TaskRecordStore, TaskState, TransitionOutcome};
use chrono::Utc;
use dashmap::DashSet;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing and concurrency knobs of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub dispatch_timeout: Duration,
    pub query_timeout: Duration,
    pub freshness: chrono::Duration,
    pub refresh_concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&KatelloConfig::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &KatelloConfig) -> Self {
        Self {
            dispatch_timeout: config.remote.dispatch_timeout(),
            query_timeout: config.remote.query_timeout(),
            freshness: config.refresh.freshness(),
            refresh_concurrency: config.refresh.concurrency.max(1),
        }
    }
}

pub struct TaskOrchestrator {
    store: Arc<dyn TaskRecordStore>,
    clients: RemoteClients,
    owners: Arc<OwnerRegistry>,
    hooks: Arc<HookRegistry>,
    settings: OrchestratorSettings,
    /// Records whose deferred dispatch is currently in progress
    redispatching: DashSet<TaskId>,
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("clients", &self.clients)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Released when dropped
pub(crate) struct RedispatchClaim<'a> {
    claims: &'a DashSet<TaskId>,
    id: TaskId,
}

impl Drop for RedispatchClaim<'_> {
    fn drop(&mut self) {
        self.claims.remove(&self.id);
    }
}

impl TaskOrchestrator {
    pub fn new(
        store: Arc<dyn TaskRecordStore>,
        clients: RemoteClients,
        owners: Arc<OwnerRegistry>,
        hooks: Arc<HookRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            clients,
            owners,
            hooks,
            settings,
            redispatching: DashSet::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskRecordStore> {
        &self.store
    }

    pub fn owners(&self) -> &Arc<OwnerRegistry> {
        &self.owners
    }

    pub fn clients(&self) -> &RemoteClients {
        &self.clients
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Claim the deferred dispatch of `id`; `None` while another refresh holds it
    pub(crate) fn claim_redispatch(&self, id: TaskId) -> Option<RedispatchClaim<'_>> {
        self.redispatching.insert(id).then_some(RedispatchClaim {
            claims: &self.redispatching,
            id,
        })
    }

    pub(crate) fn client_for(
        &self,
        task_type: TaskType,
    ) -> OrchestrationResult<&Arc<dyn RemoteActionClient>> {
        let service = task_type.service();
        self.clients
            .get(service)
            .ok_or(OrchestrationError::MissingClient { service })
    }

    /// Dispatch `task_type` for `owner` through the standard guards
    pub async fn perform(
        &self,
        owner: OwnerRef,
        task_type: TaskType,
        parameters: TaskParameters,
    ) -> OrchestrationResult<TaskRecord> {
        let guards = standard_guards(task_type);
        self.perform_guarded(owner, task_type, parameters, &guards).await
    }

    /// Dispatch with caller-supplied preconditions.
    ///
    /// Never waits for the remote job to finish. A rejected dispatch persists nothing;
    /// an unreachable service still yields one `waiting` record that a later refresh
    /// dispatches again.
    pub async fn perform_guarded(
        &self,
        owner: OwnerRef,
        task_type: TaskType,
        parameters: TaskParameters,
        guards: &[Arc<dyn DispatchGuard>],
    ) -> OrchestrationResult<TaskRecord> {
        if owner.kind != task_type.owner_kind() {
            return Err(PreconditionError::WrongOwnerKind { owner, task_type }.into());
        }
        let integrations = self
            .owners
            .integrations_of(owner)
            .ok_or(OrchestrationError::OwnerNotFound(owner))?;
        let target = self
            .owners
            .remote_target(owner)
            .ok_or(OrchestrationError::OwnerNotFound(owner))?;

        let context = DispatchContext {
            owner,
            task_type,
            parameters: &parameters,
            integrations,
        };
        for guard in guards {
            guard.check(&context).inspect_err(|e| {
                debug!(owner = %owner, task_type = %task_type, guard = guard.description(), error = %e, "Dispatch precondition failed");
            })?;
        }

        let client = self.client_for(task_type)?;
        let action = RemoteAction::new(task_type.remote_action(), target, parameters.to_remote_args());
        let request = NewTaskRecord::builder()
            .owner(owner)
            .task_type(task_type)
            .parameters(parameters)
            .remote_action(action.clone());

        let (request, immediate) = match self.dispatch_with_timeout(client.as_ref(), &action).await {
            Ok(handle) => {
                info!(
                    event = events::TASK_DISPATCHED,
                    owner = %owner,
                    task_type = %task_type,
                    correlation_id = %handle.correlation_id,
                    "🚀 Remote action dispatched"
                );
                let immediate = handle
                    .initial_status
                    .is_terminal()
                    .then(|| (handle.initial_status.to_task_state(), handle.result.clone()));
                (
                    request.remote_handle(handle.correlation_id, handle.initial_status).build(),
                    immediate,
                )
            }
            Err(e @ RemoteError::Rejected { .. }) => {
                warn!(owner = %owner, task_type = %task_type, error = %e, "Remote service rejected dispatch");
                return Err(OrchestrationError::RemoteRejected(e));
            }
            Err(e) => {
                warn!(
                    event = events::TASK_DISPATCH_DEFERRED,
                    owner = %owner,
                    task_type = %task_type,
                    error = %e,
                    "Remote service unavailable, recording task for later dispatch"
                );
                (request.build(), None)
            }
        };

        let record = self.store.create(request).await?;

        if let Some((state, result)) = immediate {
            if let Some(outcome) = self.apply_transition(record.id, state, result).await? {
                return Ok(outcome.into_record());
            }
        }
        Ok(record)
    }

    pub(crate) async fn dispatch_with_timeout(
        &self,
        client: &dyn RemoteActionClient,
        action: &RemoteAction,
    ) -> Result<RemoteHandle, RemoteError> {
        match tokio::time::timeout(self.settings.dispatch_timeout, client.dispatch(action)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::unavailable(client.service(), "dispatch timed out")),
        }
    }

    /// Apply a state change; invalid transitions are logged and yield `None`.
    ///
    /// Terminal hooks run only for the call that applied the terminal state.
    pub async fn apply_transition(
        &self,
        id: TaskId,
        to: TaskState,
        result: Option<Value>,
    ) -> OrchestrationResult<Option<TransitionOutcome>> {
        let outcome = match self.store.transition(id, to, result).await {
            Ok(outcome) => outcome,
            Err(PersistenceError::InvalidStateTransition { task_id, source }) => {
                warn!(
                    event = events::TASK_TRANSITION_IGNORED,
                    task_id = %task_id,
                    to = %to,
                    reason = %source,
                    "Ignoring invalid state transition"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match &outcome {
            TransitionOutcome::Applied { from, record } => {
                info!(
                    event = events::TASK_TRANSITIONED,
                    task_id = %record.id,
                    correlation_id = record.uuid.as_deref().unwrap_or(""),
                    task_type = %record.task_type,
                    owner = %record.owner,
                    from = %from,
                    to = %record.state,
                    "Task state advanced"
                );
                if record.is_terminal() {
                    let notice = TerminalNotice {
                        task_id: record.id,
                        owner: record.owner,
                        task_type: record.task_type,
                        final_state: record.state,
                        result: record.result.clone(),
                    };
                    self.hooks.dispatch(&notice).await;
                }
            }
            TransitionOutcome::Confirmed(record) => {
                debug!(event = events::TASK_CONFIRMED, task_id = %record.id, state = %record.state, "Duplicate terminal notification confirmed");
            }
            TransitionOutcome::Unchanged(_) => {}
        }

        Ok(Some(outcome))
    }

    /// Apply a completion reported for a correlation id.
    ///
    /// An unknown correlation id is not an error and mutates nothing.
    pub async fn apply_completion(
        &self,
        correlation_id: &str,
        state: TaskState,
        result: Option<Value>,
    ) -> OrchestrationResult<Option<TransitionOutcome>> {
        let record = match self.store.find_by_remote_id(correlation_id).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                debug!(correlation_id = %correlation_id, "Completion for unknown correlation id ignored");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        self.apply_transition(record.id, state, result).await
    }

    /// Tasks of an owner, re-querying in-flight records older than the freshness threshold
    pub async fn current_tasks(&self, owner: OwnerRef) -> OrchestrationResult<Vec<TaskRecord>> {
        if !self.owners.contains(owner) {
            return Err(OrchestrationError::OwnerNotFound(owner));
        }

        let records = self.store.list_for_owner(owner).await?;
        let now = Utc::now();
        let stale: Vec<TaskId> = records
            .iter()
            .filter(|record| record.needs_refresh(now, self.settings.freshness))
            .map(|record| record.id)
            .collect();

        if stale.is_empty() {
            return Ok(records);
        }

        let report = self.refresh_batch(&stale).await;
        debug!(owner = %owner, refreshed = report.len(), advanced = report.advanced_count(), "Refreshed stale tasks");
        Ok(self.store.list_for_owner(owner).await?)
    }

    /// Cancel in-flight work locally, cascade-delete the records and drop the owner.
    ///
    /// Remote jobs are not stopped and no terminal hooks run.
    pub async fn destroy_owner(&self, owner: OwnerRef) -> OrchestrationResult<usize> {
        if !self.owners.contains(owner) {
            return Err(OrchestrationError::OwnerNotFound(owner));
        }

        for record in self.store.list_for_owner(owner).await? {
            if !record.state.is_in_flight() {
                continue;
            }
            match self.store.transition(record.id, TaskState::Cancelled, None).await {
                Ok(_) => log_task_operation(
                    events::TASK_CANCELLED,
                    Some(record.id.0),
                    Some(record.task_type.as_str()),
                    Some(&owner.to_string()),
                    TaskState::Cancelled.as_str(),
                    Some("remote job left running"),
                ),
                Err(PersistenceError::InvalidStateTransition { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let removed = self.store.delete_for_owner(owner).await?;
        self.owners.remove(owner);
        info!(owner = %owner, removed = removed, "🗑️ Owner destroyed");
        Ok(removed)
    }
}
