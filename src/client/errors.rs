use super::types::RemoteService;
use thiserror::Error;

/// Failures talking to a remote service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transient: the service could not be reached or is overloaded
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: RemoteService,
        reason: String,
    },

    /// Permanent: the service refused the action
    #[error("{service} service rejected the action: {reason}")]
    Rejected {
        service: RemoteService,
        reason: String,
    },

    /// A status query did not answer in time
    #[error("{service} service timed out")]
    Timeout { service: RemoteService },

    /// The job is gone from the remote service
    #[error("{service} job {correlation_id} not found")]
    NotFound {
        service: RemoteService,
        correlation_id: String,
    },

    /// The service answered with something we cannot interpret
    #[error("{service} protocol error: {reason}")]
    Protocol {
        service: RemoteService,
        reason: String,
    },
}

impl RemoteError {
    pub fn unavailable(service: RemoteService, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    pub fn rejected(service: RemoteService, reason: impl Into<String>) -> Self {
        Self::Rejected {
            service,
            reason: reason.into(),
        }
    }

    pub fn protocol(service: RemoteService, reason: impl Into<String>) -> Self {
        Self::Protocol {
            service,
            reason: reason.into(),
        }
    }

    /// Transient failures never become permanent record states
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Protocol { .. }
        )
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
