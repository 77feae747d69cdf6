//! # Owner Actions
//!
//! Client-facing operations of products, repositories and content hosts. Each
//! one builds the typed parameters from the entity and goes through
//! [`TaskOrchestrator::perform`].

use super::errors::{OrchestrationError, OrchestrationResult};
use super::orchestrator::TaskOrchestrator;
use crate::client::RemoteService;
use crate::models::{OwnerRef, Product, TaskParameters, TaskRecord, TaskType};
use crate::registry::OwnerRegistry;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct OwnerActions {
    orchestrator: Arc<TaskOrchestrator>,
}

impl OwnerActions {
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    fn owners(&self) -> &OwnerRegistry {
        self.orchestrator.owners()
    }

    pub async fn sync_repository(&self, repository_id: i64) -> OrchestrationResult<TaskRecord> {
        let owner = OwnerRef::repository(repository_id);
        let repository = self
            .owners()
            .repository(repository_id)
            .ok_or(OrchestrationError::OwnerNotFound(owner))?;
        let parameters = TaskParameters::Sync {
            feed_url: repository.syncable_feed().unwrap_or_default().to_string(),
        };
        self.orchestrator
            .perform(owner, TaskType::RepositorySync, parameters)
            .await
    }

    /// Sync every repository of the product that has a feed and takes part in content sync
    pub async fn sync_product(&self, product_id: i64) -> OrchestrationResult<TaskRecord> {
        let owner = OwnerRef::product(product_id);
        if self.owners().product(product_id).is_none() {
            return Err(OrchestrationError::OwnerNotFound(owner));
        }
        let repositories = self
            .owners()
            .product_repositories(product_id)
            .into_iter()
            .filter(|repo| {
                repo.syncable_feed().is_some()
                    && repo.integrations.participates_in(RemoteService::ContentSync)
            })
            .map(|repo| repo.pulp_id)
            .collect();
        self.orchestrator
            .perform(owner, TaskType::ProductSync, TaskParameters::Repositories(repositories))
            .await
    }

    async fn host_action(
        &self,
        host_id: i64,
        task_type: TaskType,
        parameters: TaskParameters,
    ) -> OrchestrationResult<TaskRecord> {
        let owner = OwnerRef::system(host_id);
        if self.owners().content_host(host_id).is_none() {
            return Err(OrchestrationError::OwnerNotFound(owner));
        }
        self.orchestrator.perform(owner, task_type, parameters).await
    }

    pub async fn install_packages(&self, host_id: i64, packages: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::PackageInstall, TaskParameters::Packages(packages))
            .await
    }

    pub async fn remove_packages(&self, host_id: i64, packages: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::PackageRemove, TaskParameters::Packages(packages))
            .await
    }

    /// An empty package list updates every installed package
    pub async fn update_packages(&self, host_id: i64, packages: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::PackageUpdate, TaskParameters::Packages(packages))
            .await
    }

    pub async fn install_package_groups(&self, host_id: i64, groups: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::PackageGroupInstall, TaskParameters::Groups(groups))
            .await
    }

    pub async fn remove_package_groups(&self, host_id: i64, groups: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::PackageGroupRemove, TaskParameters::Groups(groups))
            .await
    }

    pub async fn install_errata(&self, host_id: i64, errata_ids: Vec<String>) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::ErrataInstall, TaskParameters::ErrataIds(errata_ids))
            .await
    }

    pub async fn refresh_subscriptions(&self, host_id: i64) -> OrchestrationResult<TaskRecord> {
        self.host_action(host_id, TaskType::SubscriptionRefresh, TaskParameters::None)
            .await
    }

    /// Local only; no remote work is dispatched
    pub fn set_sync_plan(&self, product_id: i64, sync_plan_id: i64) -> OrchestrationResult<Product> {
        self.update_sync_plan(product_id, Some(sync_plan_id))
    }

    pub fn remove_sync_plan(&self, product_id: i64) -> OrchestrationResult<Product> {
        self.update_sync_plan(product_id, None)
    }

    fn update_sync_plan(&self, product_id: i64, sync_plan_id: Option<i64>) -> OrchestrationResult<Product> {
        let owner = OwnerRef::product(product_id);
        if !self.owners().update_product(product_id, |product| product.sync_plan_id = sync_plan_id) {
            return Err(OrchestrationError::OwnerNotFound(owner));
        }
        info!(owner = %owner, sync_plan_id = ?sync_plan_id, "Sync plan updated");
        self.owners()
            .product(product_id)
            .ok_or(OrchestrationError::OwnerNotFound(owner))
    }

    pub async fn current_tasks(&self, owner: OwnerRef) -> OrchestrationResult<Vec<TaskRecord>> {
        self.orchestrator.current_tasks(owner).await
    }

    pub async fn destroy_owner(&self, owner: OwnerRef) -> OrchestrationResult<usize> {
        self.orchestrator.destroy_owner(owner).await
    }
}
