//! # Terminal Hook Registry
//!
//! Side effects that run when a task record reaches a terminal state. Hooks are
//! registered per task type or for every type and run in registration order.

use crate::client::RemoteError;
use crate::models::{OwnerRef, TaskId, TaskType};
use crate::state_machine::TaskState;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// What a hook receives about the finished record
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalNotice {
    pub task_id: TaskId,
    pub owner: OwnerRef,
    pub task_type: TaskType,
    pub final_state: TaskState,
    pub result: Option<Value>,
}

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Owner {0} no longer exists")]
    OwnerMissing(OwnerRef),

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Hook failed: {0}")]
    Failed(String),
}

pub type HookResult<T> = Result<T, HookError>;

#[async_trait]
pub trait TerminalHook: Send + Sync {
    async fn on_terminal(&self, notice: &TerminalNotice) -> HookResult<()>;

    fn hook_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[derive(Default)]
pub struct HookRegistry {
    by_type: RwLock<HashMap<TaskType, Vec<Arc<dyn TerminalHook>>>>,
    every_type: RwLock<Vec<Arc<dyn TerminalHook>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("task_types", &self.by_type.read().len())
            .field("every_type", &self.every_type.read().len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, task_type: TaskType, hook: Arc<dyn TerminalHook>) {
        debug!(task_type = %task_type, hook = hook.hook_name(), "Registering terminal hook");
        self.by_type.write().entry(task_type).or_default().push(hook);
    }

    /// Register a hook that runs for every task type, after the type-specific ones
    pub fn register_for_all(&self, hook: Arc<dyn TerminalHook>) {
        debug!(hook = hook.hook_name(), "Registering terminal hook for all task types");
        self.every_type.write().push(hook);
    }

    pub fn hooks_for(&self, task_type: TaskType) -> Vec<Arc<dyn TerminalHook>> {
        let mut hooks = self
            .by_type
            .read()
            .get(&task_type)
            .cloned()
            .unwrap_or_default();
        hooks.extend(self.every_type.read().iter().cloned());
        hooks
    }

    /// Run every matching hook; failures are logged and never stop later hooks.
    ///
    /// Returns how many hooks succeeded.
    pub async fn dispatch(&self, notice: &TerminalNotice) -> usize {
        let mut succeeded = 0;
        for hook in self.hooks_for(notice.task_type) {
            match hook.on_terminal(notice).await {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(
                    task_id = %notice.task_id,
                    owner = %notice.owner,
                    hook = hook.hook_name(),
                    error = %e,
                    "Terminal hook failed"
                ),
            }
        }
        succeeded
    }
}
