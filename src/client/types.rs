//! # Remote Action Types
//!
//! Values exchanged with the content-sync, entitlement and indexing services.

use crate::state_machine::TaskState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Remote subsystem a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteService {
    /// Repository synchronisation and consumer content actions (Pulp)
    ContentSync,
    /// Subscriptions and entitlements (Candlepin)
    Entitlement,
    /// Search index maintenance
    Indexing,
}

impl RemoteService {
    pub const ALL: [RemoteService; 3] = [Self::ContentSync, Self::Entitlement, Self::Indexing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentSync => "content_sync",
            Self::Entitlement => "entitlement",
            Self::Indexing => "indexing",
        }
    }
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of remote work: what to do, to what, with which arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAction {
    pub action: String,
    pub target: String,
    #[serde(default)]
    pub args: Value,
}

impl RemoteAction {
    pub fn new(action: impl Into<String>, target: impl Into<String>, args: Value) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            args,
        }
    }
}

/// Job status as reported by a remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobState {
    #[default]
    Waiting,
    Running,
    Finished,
    Error,
}

impl RemoteJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    pub fn to_task_state(self) -> TaskState {
        match self {
            Self::Waiting => TaskState::Waiting,
            Self::Running => TaskState::Running,
            Self::Finished => TaskState::Success,
            Self::Error => TaskState::Error,
        }
    }
}

/// Returned by `dispatch`: correlation id plus the status at dispatch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteHandle {
    pub correlation_id: String,
    #[serde(default, alias = "status")]
    pub initial_status: RemoteJobState,
    /// Present when the service finished the work synchronously
    #[serde(default)]
    pub result: Option<Value>,
}

impl RemoteHandle {
    pub fn new(correlation_id: impl Into<String>, initial_status: RemoteJobState) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            initial_status,
            result: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Returned by `query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatus {
    #[serde(alias = "status")]
    pub state: RemoteJobState,
    #[serde(default)]
    pub result: Option<Value>,
}

impl RemoteStatus {
    pub fn new(state: RemoteJobState) -> Self {
        Self { state, result: None }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}
