//! # Web API Application State

use super::callback::CallbackIngestor;
use crate::orchestration::{OwnerActions, TaskOrchestrator};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub actions: OwnerActions,
    pub callbacks: Arc<CallbackIngestor>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(actions: OwnerActions, callbacks: Arc<CallbackIngestor>) -> Self {
        Self {
            actions,
            callbacks,
            started_at: Utc::now(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        self.actions.orchestrator()
    }
}
