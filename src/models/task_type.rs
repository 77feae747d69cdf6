//! # Task Types and Parameters
//!
//! Every task type knows which remote service runs it, which owner kind may
//! sponsor it and which parameter payload it carries.

use super::owner::OwnerKind;
use crate::client::RemoteService;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated kinds of remote work tracked by task records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    PackageInstall,
    PackageRemove,
    PackageUpdate,
    PackageGroupInstall,
    PackageGroupRemove,
    ErrataInstall,
    RepositorySync,
    ProductSync,
    SubscriptionRefresh,
}

/// Shape of the parameters a task type expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Packages,
    Groups,
    ErrataIds,
    Repositories,
    Sync,
    None,
}

impl TaskType {
    pub const ALL: [TaskType; 9] = [
        Self::PackageInstall,
        Self::PackageRemove,
        Self::PackageUpdate,
        Self::PackageGroupInstall,
        Self::PackageGroupRemove,
        Self::ErrataInstall,
        Self::RepositorySync,
        Self::ProductSync,
        Self::SubscriptionRefresh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageInstall => "package_install",
            Self::PackageRemove => "package_remove",
            Self::PackageUpdate => "package_update",
            Self::PackageGroupInstall => "package_group_install",
            Self::PackageGroupRemove => "package_group_remove",
            Self::ErrataInstall => "errata_install",
            Self::RepositorySync => "repository_sync",
            Self::ProductSync => "product_sync",
            Self::SubscriptionRefresh => "subscription_refresh",
        }
    }

    /// Remote subsystem that executes this kind of work
    pub fn service(&self) -> RemoteService {
        match self {
            Self::SubscriptionRefresh => RemoteService::Entitlement,
            _ => RemoteService::ContentSync,
        }
    }

    /// Action name sent to the remote service on dispatch
    pub fn remote_action(&self) -> &'static str {
        match self {
            Self::PackageInstall => "consumer.package.install",
            Self::PackageRemove => "consumer.package.uninstall",
            Self::PackageUpdate => "consumer.package.update",
            Self::PackageGroupInstall => "consumer.package_group.install",
            Self::PackageGroupRemove => "consumer.package_group.uninstall",
            Self::ErrataInstall => "consumer.errata.install",
            Self::RepositorySync => "repository.sync",
            Self::ProductSync => "product.sync",
            Self::SubscriptionRefresh => "consumer.entitlements.refresh",
        }
    }

    /// The only owner kind allowed to sponsor this task type
    pub fn owner_kind(&self) -> OwnerKind {
        match self {
            Self::RepositorySync => OwnerKind::Repository,
            Self::ProductSync => OwnerKind::Product,
            _ => OwnerKind::System,
        }
    }

    pub fn parameter_kind(&self) -> ParameterKind {
        match self {
            Self::PackageInstall | Self::PackageRemove | Self::PackageUpdate => {
                ParameterKind::Packages
            }
            Self::PackageGroupInstall | Self::PackageGroupRemove => ParameterKind::Groups,
            Self::ErrataInstall => ParameterKind::ErrataIds,
            Self::RepositorySync => ParameterKind::Sync,
            Self::ProductSync => ParameterKind::Repositories,
            Self::SubscriptionRefresh => ParameterKind::None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task_type| task_type.as_str() == s)
            .ok_or_else(|| format!("Invalid task type: {s}"))
    }
}

/// Typed payload recorded with a task, keyed by task type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum TaskParameters {
    Packages(Vec<String>),
    Groups(Vec<String>),
    ErrataIds(Vec<String>),
    /// Remote ids of the repositories covered by a product sync
    Repositories(Vec<String>),
    Sync { feed_url: String },
    #[default]
    None,
}

impl TaskParameters {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Packages(_) => ParameterKind::Packages,
            Self::Groups(_) => ParameterKind::Groups,
            Self::ErrataIds(_) => ParameterKind::ErrataIds,
            Self::Repositories(_) => ParameterKind::Repositories,
            Self::Sync { .. } => ParameterKind::Sync,
            Self::None => ParameterKind::None,
        }
    }

    /// Item list carried by list-shaped parameters
    pub fn items(&self) -> &[String] {
        match self {
            Self::Packages(items)
            | Self::Groups(items)
            | Self::ErrataIds(items)
            | Self::Repositories(items) => items,
            Self::Sync { .. } | Self::None => &[],
        }
    }

    /// Arguments forwarded to the remote service on dispatch
    pub fn to_remote_args(&self) -> serde_json::Value {
        match self {
            Self::Packages(items) => serde_json::json!({ "packages": items }),
            Self::Groups(items) => serde_json::json!({ "groups": items }),
            Self::ErrataIds(items) => serde_json::json!({ "errata_ids": items }),
            Self::Repositories(items) => serde_json::json!({ "repositories": items }),
            Self::Sync { feed_url } => serde_json::json!({ "feed_url": feed_url }),
            Self::None => serde_json::json!({}),
        }
    }
}
