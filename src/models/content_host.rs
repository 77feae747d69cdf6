use super::owner::{Integrations, OwnerRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered system (content host) that receives package and errata actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentHost {
    pub id: i64,
    pub name: String,
    /// Consumer uuid shared with the entitlement and content-sync services
    pub uuid: Uuid,
    pub integrations: Integrations,
}

impl ContentHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            uuid: Uuid::new_v4(),
            integrations: Integrations::all(),
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::system(self.id)
    }
}
