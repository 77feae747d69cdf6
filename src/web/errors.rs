//! # Web API Error Types
//!
//! HTTP mapping of the core errors. Bodies are `{"error": {"code", "message"}}`.

use super::callback::CallbackError;
use crate::orchestration::OrchestrationError;
use crate::state_machine::PersistenceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Unprocessable request: {message}")]
    UnprocessableEntity { message: String },

    #[error("Remote service refused the action: {message}")]
    BadGateway { message: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_code, message) = match &self {
            ApiError::NotFound => ("NOT_FOUND", "Resource not found"),
            ApiError::Forbidden => ("FORBIDDEN", "Access denied"),
            ApiError::BadRequest { message } => ("BAD_REQUEST", message.as_str()),
            ApiError::UnprocessableEntity { message } => ("UNPROCESSABLE_ENTITY", message.as_str()),
            ApiError::BadGateway { message } => ("BAD_GATEWAY", message.as_str()),
            ApiError::Internal => ("INTERNAL_ERROR", "Internal server error"),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });

        (self.status_code(), Json(error_response)).into_response()
    }
}

impl From<OrchestrationError> for ApiError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Precondition(e) => ApiError::UnprocessableEntity {
                message: e.to_string(),
            },
            e @ OrchestrationError::MissingClient { .. } => ApiError::UnprocessableEntity {
                message: e.to_string(),
            },
            OrchestrationError::RemoteRejected(e) => ApiError::BadGateway {
                message: e.to_string(),
            },
            OrchestrationError::OwnerNotFound(_) => ApiError::NotFound,
            OrchestrationError::Persistence(e) => e.into(),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { .. } => ApiError::NotFound,
            PersistenceError::Validation { .. } => ApiError::bad_request(err.to_string()),
            other => {
                error!(error = %other, "Task store operation failed");
                ApiError::Internal
            }
        }
    }
}

impl From<CallbackError> for ApiError {
    fn from(err: CallbackError) -> Self {
        match err {
            CallbackError::Unauthorized => ApiError::Forbidden,
            CallbackError::Malformed(message) => ApiError::BadRequest { message },
            CallbackError::Orchestration(e) => e.into(),
        }
    }
}

/// Result type alias for web API operations
pub type ApiResult<T> = Result<T, ApiError>;
