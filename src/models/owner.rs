//! # Task Owners
//!
//! Tagged reference to the domain entity on whose behalf a task record exists,
//! plus the capability flags that decide which remote services an entity
//! participates in.

use crate::client::RemoteService;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of domain entity able to sponsor asynchronous work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// A registered content host
    System,
    Product,
    Repository,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Product => "product",
            Self::Repository => "repository",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OwnerKind {
    type Err = String;

    /// Accepts both singular and the plural route segments
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" | "systems" | "content_host" | "content_hosts" => Ok(Self::System),
            "product" | "products" => Ok(Self::Product),
            "repository" | "repositories" => Ok(Self::Repository),
            _ => Err(format!("Invalid owner kind: {s}")),
        }
    }
}

/// Exclusive owner of a task record for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: i64,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn system(id: i64) -> Self {
        Self::new(OwnerKind::System, id)
    }

    pub fn product(id: i64) -> Self {
        Self::new(OwnerKind::Product, id)
    }

    pub fn repository(id: i64) -> Self {
        Self::new(OwnerKind::Repository, id)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Integrations an entity (or the whole deployment) participates in.
///
/// Resolved once when an entity is constructed; an entity never gains a
/// capability the deployment does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Integrations {
    pub content_sync: bool,
    pub entitlement: bool,
    pub indexing: bool,
}

impl Default for Integrations {
    fn default() -> Self {
        Self::all()
    }
}

impl Integrations {
    pub const fn all() -> Self {
        Self {
            content_sync: true,
            entitlement: true,
            indexing: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            content_sync: false,
            entitlement: false,
            indexing: false,
        }
    }

    pub fn with(mut self, service: RemoteService) -> Self {
        match service {
            RemoteService::ContentSync => self.content_sync = true,
            RemoteService::Entitlement => self.entitlement = true,
            RemoteService::Indexing => self.indexing = true,
        }
        self
    }

    pub fn without(mut self, service: RemoteService) -> Self {
        match service {
            RemoteService::ContentSync => self.content_sync = false,
            RemoteService::Entitlement => self.entitlement = false,
            RemoteService::Indexing => self.indexing = false,
        }
        self
    }

    pub fn participates_in(&self, service: RemoteService) -> bool {
        match service {
            RemoteService::ContentSync => self.content_sync,
            RemoteService::Entitlement => self.entitlement,
            RemoteService::Indexing => self.indexing,
        }
    }

    /// Capabilities present in both sets
    pub fn intersect(&self, other: &Integrations) -> Integrations {
        Integrations {
            content_sync: self.content_sync && other.content_sync,
            entitlement: self.entitlement && other.entitlement,
            indexing: self.indexing && other.indexing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kind_parses_route_segments() {
        assert_eq!("systems".parse::<OwnerKind>().unwrap(), OwnerKind::System);
        assert_eq!("repositories".parse::<OwnerKind>().unwrap(), OwnerKind::Repository);
        assert_eq!("product".parse::<OwnerKind>().unwrap(), OwnerKind::Product);
        assert!("organizations".parse::<OwnerKind>().is_err());
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(OwnerRef::repository(7).to_string(), "repository:7");
    }

    #[test]
    fn test_integrations_intersection() {
        let deployment = Integrations::all().without(RemoteService::Indexing);
        let host = Integrations::none()
            .with(RemoteService::Indexing)
            .with(RemoteService::ContentSync);

        let resolved = deployment.intersect(&host);
        assert!(resolved.participates_in(RemoteService::ContentSync));
        assert!(!resolved.participates_in(RemoteService::Indexing));
        assert!(!resolved.participates_in(RemoteService::Entitlement));
    }
}
