use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a dispatched remote job as tracked by its task record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Recorded locally, the remote service has not started the job yet
    #[default]
    Waiting,
    /// The remote service reports the job as executing
    Running,
    /// The remote job completed successfully
    Success,
    /// The remote job failed, was rejected on redispatch, or disappeared
    Error,
    /// Local bookkeeping only: the owner went away while the job was in flight
    Cancelled,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }

    /// Check if the record still needs polling or a callback
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Waiting | Self::Running)
    }

    /// Position in the forward-only ordering waiting < running < terminal
    pub fn rank(&self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Running => 1,
            Self::Success | Self::Error | Self::Cancelled => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// All states, in rank order
    pub const ALL: [TaskState; 5] = [
        Self::Waiting,
        Self::Running,
        Self::Success,
        Self::Error,
        Self::Cancelled,
    ];
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_terminal_check() {
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Error.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::Waiting.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }

    #[test]
    fn test_rank_is_forward_ordering() {
        assert!(TaskState::Waiting.rank() < TaskState::Running.rank());
        assert!(TaskState::Running.rank() < TaskState::Success.rank());
        assert_eq!(TaskState::Error.rank(), TaskState::Cancelled.rank());
    }

    #[test]
    fn test_state_string_conversion() {
        for state in TaskState::ALL {
            assert_eq!(state.to_string().parse::<TaskState>().unwrap(), state);
        }
        assert!("in_progress".parse::<TaskState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&TaskState::Running).unwrap();
        assert_eq!(json, "\"running\"");

        let parsed: TaskState = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, TaskState::Cancelled);
    }
}
