//! # Dispatch Guards
//!
//! Preconditions checked before a remote action is dispatched. A failing guard
//! means no remote call and no task record.

use super::errors::PreconditionError;
use crate::models::{Integrations, OwnerRef, TaskParameters, TaskType};
use std::sync::Arc;

/// Everything a guard may inspect about a pending dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub owner: OwnerRef,
    pub task_type: TaskType,
    pub parameters: &'a TaskParameters,
    /// Resolved integration flags of the owner
    pub integrations: Integrations,
}

pub trait DispatchGuard: Send + Sync {
    fn check(&self, ctx: &DispatchContext<'_>) -> Result<(), PreconditionError>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// The owner must participate in the service that runs the task type
pub struct IntegrationGuard;

impl DispatchGuard for IntegrationGuard {
    fn check(&self, ctx: &DispatchContext<'_>) -> Result<(), PreconditionError> {
        let service = ctx.task_type.service();
        if ctx.integrations.participates_in(service) {
            Ok(())
        } else {
            Err(PreconditionError::IntegrationDisabled {
                owner: ctx.owner,
                service,
            })
        }
    }

    fn description(&self) -> &'static str {
        "Owner participates in the task's integration"
    }
}

/// Repository sync needs a feed url
pub struct FeedUrlGuard;

impl DispatchGuard for FeedUrlGuard {
    fn check(&self, ctx: &DispatchContext<'_>) -> Result<(), PreconditionError> {
        match ctx.parameters {
            TaskParameters::Sync { feed_url } if !feed_url.trim().is_empty() => Ok(()),
            _ => Err(PreconditionError::MissingFeedUrl { owner: ctx.owner }),
        }
    }

    fn description(&self) -> &'static str {
        "Repository has a feed url"
    }
}

/// List-shaped parameters must not be empty
pub struct NonEmptyGuard;

impl DispatchGuard for NonEmptyGuard {
    fn check(&self, ctx: &DispatchContext<'_>) -> Result<(), PreconditionError> {
        let item = match ctx.parameters {
            TaskParameters::Packages(_) => "package",
            TaskParameters::Groups(_) => "package group",
            TaskParameters::ErrataIds(_) => "erratum",
            TaskParameters::Repositories(_) => "repository",
            TaskParameters::Sync { .. } | TaskParameters::None => return Ok(()),
        };
        if ctx.parameters.items().iter().any(|i| !i.trim().is_empty()) {
            Ok(())
        } else {
            Err(PreconditionError::EmptyList {
                task_type: ctx.task_type,
                item,
            })
        }
    }

    fn description(&self) -> &'static str {
        "Requested item list is not empty"
    }
}

/// Product sync needs at least one repository with a feed
pub struct ProductRepositoriesGuard;

impl DispatchGuard for ProductRepositoriesGuard {
    fn check(&self, ctx: &DispatchContext<'_>) -> Result<(), PreconditionError> {
        if ctx.parameters.items().is_empty() {
            Err(PreconditionError::NoSyncableRepositories { owner: ctx.owner })
        } else {
            Ok(())
        }
    }

    fn description(&self) -> &'static str {
        "Product has syncable repositories"
    }
}

/// The guards every dispatch of `task_type` goes through
pub fn standard_guards(task_type: TaskType) -> Vec<Arc<dyn DispatchGuard>> {
    let mut guards: Vec<Arc<dyn DispatchGuard>> = vec![Arc::new(IntegrationGuard)];
    match task_type {
        TaskType::RepositorySync => guards.push(Arc::new(FeedUrlGuard)),
        TaskType::ProductSync => guards.push(Arc::new(ProductRepositoriesGuard)),
        // An empty list means a full system update
        TaskType::PackageUpdate | TaskType::SubscriptionRefresh => {}
        TaskType::PackageInstall
        | TaskType::PackageRemove
        | TaskType::PackageGroupInstall
        | TaskType::PackageGroupRemove
        | TaskType::ErrataInstall => guards.push(Arc::new(NonEmptyGuard)),
    }
    guards
}
