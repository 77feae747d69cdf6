//! Task dispatch and listing endpoints

use crate::models::{OwnerRef, TaskRecord};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

/// `POST /api/v2/repositories/{id}/sync`: accepted, the sync runs remotely
pub async fn sync_repository(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<TaskRecord>)> {
    let record = state.actions.sync_repository(id).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

async fn owner_tasks(state: &AppState, owner: OwnerRef) -> ApiResult<Json<Vec<TaskRecord>>> {
    Ok(Json(state.actions.current_tasks(owner).await?))
}

pub async fn system_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    owner_tasks(&state, OwnerRef::system(id)).await
}

pub async fn product_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    owner_tasks(&state, OwnerRef::product(id)).await
}

pub async fn repository_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<TaskRecord>>> {
    owner_tasks(&state, OwnerRef::repository(id)).await
}
