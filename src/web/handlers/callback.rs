//! Sync-completion callback: `POST /api/v2/repositories/sync_complete?token=...`

use crate::web::callback::{CallbackAck, CallbackBody, CallbackError};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

/// The token is checked before the body is even parsed
pub async fn sync_complete(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> ApiResult<Json<CallbackAck>> {
    state.callbacks.authorize(query.token.as_deref())?;

    let body: CallbackBody = serde_json::from_slice(&body)
        .map_err(|e| CallbackError::Malformed(e.to_string()))?;
    let Some((correlation_id, result)) = body.into_parts() else {
        debug!("Sync notification without job id acknowledged");
        return Ok(Json(CallbackAck::Ignored));
    };

    let ack = state
        .callbacks
        .ingest_authorized(&correlation_id, result)
        .await?;
    Ok(Json(ack))
}
