//! # Callback Ingestion
//!
//! Verifies the shared secret, derives the terminal state from the remote
//! payload and hands the completion to the orchestrator. A mismatched token
//! never reaches the store.

use super::auth::SyncToken;
use crate::constants::events;
use crate::logging::log_security_event;
use crate::models::TaskId;
use crate::orchestration::{OrchestrationError, TaskOrchestrator};
use crate::state_machine::{TaskState, TransitionOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const SUCCESS_STATES: [&str; 4] = ["success", "finished", "completed", "complete"];
const ERROR_STATES: [&str; 5] = ["error", "failed", "failure", "canceled", "cancelled"];

#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Callback token mismatch")]
    Unauthorized,

    #[error("Malformed callback: {0}")]
    Malformed(String),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
}

/// Acknowledgement returned for an authorized callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackAck {
    /// The record moved to its terminal state
    Applied { task_id: TaskId, state: TaskState },
    /// The same completion had already been applied
    Confirmed { task_id: TaskId },
    /// Unknown correlation id or a completion the record no longer accepts
    Ignored,
}

/// Inbound callback bodies
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallbackBody {
    Direct {
        correlation_id: String,
        #[serde(default)]
        result: Value,
    },
    /// Content-sync notification: the job id lives in `call_report.task_id`
    CallReport {
        #[serde(default)]
        payload: Value,
        call_report: Value,
    },
}

impl CallbackBody {
    /// Correlation id and result payload of the callback; `None` when the
    /// notification carries no job id
    pub fn into_parts(self) -> Option<(String, Value)> {
        match self {
            Self::Direct {
                correlation_id,
                result,
            } => Some((correlation_id, result)),
            Self::CallReport { call_report, .. } => {
                let correlation_id = call_report.get("task_id").and_then(Value::as_str)?.to_string();
                Some((correlation_id, call_report))
            }
        }
    }
}

/// Terminal state a completion payload reports
pub fn terminal_state_for(result: &Value) -> TaskState {
    let reported = ["state", "status"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_str))
        .map(str::to_ascii_lowercase);

    if let Some(reported) = reported.as_deref() {
        if SUCCESS_STATES.contains(&reported) {
            return TaskState::Success;
        }
        if ERROR_STATES.contains(&reported) {
            return TaskState::Error;
        }
    }

    let failed = ["exception", "error"]
        .iter()
        .any(|key| result.get(*key).is_some_and(|v| !v.is_null()));
    if failed {
        TaskState::Error
    } else {
        TaskState::Success
    }
}

#[derive(Debug)]
pub struct CallbackIngestor {
    token: SyncToken,
    orchestrator: Arc<TaskOrchestrator>,
}

impl CallbackIngestor {
    pub fn new(token: SyncToken, orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self {
            token,
            orchestrator,
        }
    }

    /// Reject a mismatched token; logged on the security target
    pub fn authorize(&self, token: Option<&str>) -> Result<(), CallbackError> {
        if self.token.verify(token) {
            return Ok(());
        }
        let details = if token.is_none() {
            "token missing"
        } else if !self.token.is_configured() {
            "no sync token configured"
        } else {
            "token mismatch"
        };
        log_security_event(events::CALLBACK_REJECTED, "sync_complete", Some(details));
        Err(CallbackError::Unauthorized)
    }

    /// Verify the token, then apply the completion
    pub async fn ingest(
        &self,
        token: Option<&str>,
        correlation_id: &str,
        result: Value,
    ) -> Result<CallbackAck, CallbackError> {
        self.authorize(token)?;
        self.ingest_authorized(correlation_id, result).await
    }

    /// Apply a completion whose token was already verified
    pub async fn ingest_authorized(
        &self,
        correlation_id: &str,
        result: Value,
    ) -> Result<CallbackAck, CallbackError> {
        let state = terminal_state_for(&result);
        info!(
            event = events::CALLBACK_RECEIVED,
            correlation_id = %correlation_id,
            state = %state,
            "📨 Completion callback received"
        );

        let ack = match self
            .orchestrator
            .apply_completion(correlation_id, state, Some(result))
            .await?
        {
            Some(TransitionOutcome::Applied { record, .. }) => CallbackAck::Applied {
                task_id: record.id,
                state: record.state,
            },
            Some(TransitionOutcome::Confirmed(record)) => CallbackAck::Confirmed { task_id: record.id },
            Some(TransitionOutcome::Unchanged(_)) | None => CallbackAck::Ignored,
        };
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_state_from_status_fields() {
        assert_eq!(terminal_state_for(&json!({"status": "success"})), TaskState::Success);
        assert_eq!(terminal_state_for(&json!({"state": "finished"})), TaskState::Success);
        assert_eq!(terminal_state_for(&json!({"state": "Failed"})), TaskState::Error);
        assert_eq!(terminal_state_for(&json!({"status": "canceled"})), TaskState::Error);
    }

    #[test]
    fn test_terminal_state_from_error_fields() {
        assert_eq!(
            terminal_state_for(&json!({"exception": "Timeout", "traceback": []})),
            TaskState::Error
        );
        assert_eq!(
            terminal_state_for(&json!({"error": null, "result": "ok"})),
            TaskState::Success
        );
        assert_eq!(terminal_state_for(&Value::Null), TaskState::Success);
    }

    #[test]
    fn test_status_wins_over_error_field() {
        assert_eq!(
            terminal_state_for(&json!({"state": "finished", "error": {"details": "warning"}})),
            TaskState::Success
        );
    }

    #[test]
    fn test_body_shapes() {
        let direct: CallbackBody =
            serde_json::from_value(json!({"correlation_id": "R1", "result": {"status": "success"}})).unwrap();
        let (id, result) = direct.into_parts().unwrap();
        assert_eq!(id, "R1");
        assert_eq!(result["status"], "success");

        let report: CallbackBody = serde_json::from_value(json!({
            "payload": {"repo_id": "zoo_el9"},
            "call_report": {"task_id": "R2", "state": "finished"}
        }))
        .unwrap();
        let (id, result) = report.into_parts().unwrap();
        assert_eq!(id, "R2");
        assert_eq!(terminal_state_for(&result), TaskState::Success);

        let without_job: CallbackBody =
            serde_json::from_value(json!({"payload": {"repo_id": "zoo_el9"}, "call_report": {}})).unwrap();
        assert!(without_job.into_parts().is_none());
    }
}
