//! # Remote Action Client Trait
//!
//! The seam every remote subsystem client implements. Calls are blocking network
//! I/O from the caller's perspective and hold no shared state between calls.

use super::errors::RemoteResult;
use super::types::{RemoteAction, RemoteHandle, RemoteService, RemoteStatus};
use async_trait::async_trait;

#[async_trait]
pub trait RemoteActionClient: Send + Sync {
    /// Which subsystem this client talks to
    fn service(&self) -> RemoteService;

    /// Fire a remote job and return immediately with its handle
    ///
    /// # Returns
    ///
    /// * `Ok(RemoteHandle)` - correlation id and status at dispatch time
    /// * `Err(RemoteError::Unavailable)` - transient, the caller still records the task
    /// * `Err(RemoteError::Rejected)` - permanent, the caller must not record the task
    async fn dispatch(&self, action: &RemoteAction) -> RemoteResult<RemoteHandle>;

    /// Synchronous status check for a previously dispatched job
    ///
    /// # Returns
    ///
    /// * `Err(RemoteError::Timeout)` - no new information
    /// * `Err(RemoteError::NotFound)` - the job is gone
    async fn query(&self, correlation_id: &str) -> RemoteResult<RemoteStatus>;

    /// Client name for logging
    fn client_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
