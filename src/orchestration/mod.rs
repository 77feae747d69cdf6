//! # Orchestration Engine
//!
//! Dispatch, correlation and reconciliation of asynchronous remote work.
//!
//! ## Core Components
//!
//! - **TaskOrchestrator**: dispatch plus record creation as one unit, completion handling
//! - **Refresh**: bounded per-id re-query of in-flight records
//! - **DispatchGuard**: preconditions checked before any remote call
//! - **OwnerActions**: client-facing operations of products, repositories and content hosts
//! - **PollSweeper**: periodic refresh of everything still in flight
//! - **Side effects**: built-in terminal hooks

pub mod errors;
pub mod guards;
pub mod orchestrator;
pub mod owner_actions;
pub mod poll_sweeper;
pub mod refresh;
pub mod side_effects;

// Re-export core types and components for easy access
pub use errors::{OrchestrationError, OrchestrationResult, PreconditionError};
pub use guards::{
    standard_guards, DispatchContext, DispatchGuard, FeedUrlGuard, IntegrationGuard,
    NonEmptyGuard, ProductRepositoriesGuard,
};
pub use orchestrator::{OrchestratorSettings, TaskOrchestrator};
pub use owner_actions::OwnerActions;
pub use poll_sweeper::PollSweeper;
pub use refresh::{RefreshFailure, RefreshOutcome, RefreshReport};
pub use side_effects::{register_builtin_hooks, IndexingHook, ProductSyncHook, RepositorySyncHook};
