use super::owner::{Integrations, OwnerRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A content repository synchronised from an upstream feed by the content-sync service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    /// Identifier of the repository inside the content-sync service
    pub pulp_id: String,
    pub product_id: Option<i64>,
    pub feed_url: Option<String>,
    pub integrations: Integrations,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Error payload of the most recent failed sync, kept for display
    pub last_sync_error: Option<Value>,
}

impl Repository {
    pub fn new(name: impl Into<String>, pulp_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            pulp_id: pulp_id.into(),
            product_id: None,
            feed_url: None,
            integrations: Integrations::all(),
            last_synced_at: None,
            last_sync_error: None,
        }
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    pub fn with_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::repository(self.id)
    }

    /// A repository without a usable feed cannot be synchronised
    pub fn syncable_feed(&self) -> Option<&str> {
        self.feed_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn is_synced(&self) -> bool {
        self.last_synced_at.is_some()
    }
}
