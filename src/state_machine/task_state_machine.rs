//! # Task State Machine
//!
//! Pure transition rules for task records. Stores call [`TaskStateMachine::evaluate`]
//! while holding their per-record guard, so the decision and the write are atomic.

use super::errors::{StateMachineError, StateMachineResult};
use super::states::TaskState;
use serde_json::Value;

/// What a store must do with a requested transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Move the record to the requested state
    Apply,
    /// Same non-terminal state; nothing to write
    Unchanged,
    /// Same terminal state with the same result; a duplicate notification
    Confirmed,
}

pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Decide whether `current` may move to `target`.
    ///
    /// Forward-only over waiting < running < terminal. Skipping `running` is allowed
    /// because a completion callback can arrive before any poll observed the job start.
    pub fn evaluate(
        current: TaskState,
        current_result: Option<&Value>,
        target: TaskState,
        result: Option<&Value>,
    ) -> StateMachineResult<TransitionDecision> {
        if current == target {
            if !current.is_terminal() {
                return Ok(TransitionDecision::Unchanged);
            }
            if current_result == result {
                return Ok(TransitionDecision::Confirmed);
            }
            return Err(StateMachineError::ConflictingResult { state: current });
        }

        if current.is_terminal() || target.rank() <= current.rank() {
            return Err(StateMachineError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        Ok(TransitionDecision::Apply)
    }

    /// Whether `target` is reachable from `current` by a valid forward path
    pub fn can_transition(current: TaskState, target: TaskState) -> bool {
        !current.is_terminal() && target.rank() > current.rank()
    }
}
