use super::owner::{Integrations, OwnerRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named collection of repositories that can be synchronised as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub label: String,
    pub sync_plan_id: Option<i64>,
    pub integrations: Integrations,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<Value>,
}

impl Product {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            label: label.into(),
            sync_plan_id: None,
            integrations: Integrations::all(),
            last_synced_at: None,
            last_sync_error: None,
        }
    }

    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::product(self.id)
    }
}
