// State machine module for task records
//
// Forward-only lifecycle of a dispatched remote job and the persistence seam
// that applies it under a per-record guard.

pub mod errors;
pub mod persistence;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{PersistenceError, PersistenceResult, StateMachineError, StateMachineResult};
pub use persistence::{TaskRecordStore, TransitionOutcome};
pub use states::TaskState;
pub use task_state_machine::{TaskStateMachine, TransitionDecision};
