use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: i64,
    /// Remote services with a configured client
    integrations: Vec<&'static str>,
}

/// Basic health check endpoint: GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let available = state.orchestrator().clients().available();
    let integrations = crate::client::RemoteService::ALL
        .into_iter()
        .filter(|service| available.participates_in(*service))
        .map(|service| service.as_str())
        .collect();

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        integrations,
    })
}
