//! # Remote Action Clients
//!
//! Abstraction over the content-sync, entitlement and indexing services.
//!
//! - [`RemoteActionClient`]: dispatch a job, query its status
//! - [`HttpRemoteClient`]: JSON-over-HTTP implementation
//! - [`RemoteClients`]: the capability set resolved at startup

pub mod errors;
pub mod http;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export main types for easy access
pub use errors::{RemoteError, RemoteResult};
pub use http::HttpRemoteClient;
pub use registry::RemoteClients;
pub use traits::RemoteActionClient;
pub use types::{RemoteAction, RemoteHandle, RemoteJobState, RemoteService, RemoteStatus};
