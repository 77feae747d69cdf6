//! # Registry Infrastructure
//!
//! - [`OwnerRegistry`]: arena of owner entities indexed by kind
//! - [`HookRegistry`]: terminal side-effect hooks keyed by task type

pub mod hook_registry;
pub mod owner_registry;

// Re-export main types for easy access
pub use hook_registry::{HookError, HookRegistry, HookResult, TerminalHook, TerminalNotice};
pub use owner_registry::OwnerRegistry;
