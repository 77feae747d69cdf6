//! # Owner Registry
//!
//! Arena of owner entities indexed by kind and id. Entities get their id and
//! their resolved integration flags when they are added.

use crate::models::{ContentHost, Integrations, OwnerKind, OwnerRef, Product, Repository};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct OwnerRegistry {
    deployment: Integrations,
    next_id: AtomicI64,
    content_hosts: DashMap<i64, ContentHost>,
    products: DashMap<i64, Product>,
    repositories: DashMap<i64, Repository>,
}

impl Default for OwnerRegistry {
    fn default() -> Self {
        Self::new(Integrations::all())
    }
}

impl OwnerRegistry {
    /// `deployment` caps the integrations any entity may participate in
    pub fn new(deployment: Integrations) -> Self {
        Self {
            deployment,
            next_id: AtomicI64::new(1),
            content_hosts: DashMap::new(),
            products: DashMap::new(),
            repositories: DashMap::new(),
        }
    }

    pub fn deployment(&self) -> Integrations {
        self.deployment
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add_content_host(&self, mut host: ContentHost) -> ContentHost {
        host.id = self.allocate_id();
        host.integrations = self.deployment.intersect(&host.integrations);
        self.content_hosts.insert(host.id, host.clone());
        debug!(owner = %host.owner_ref(), name = %host.name, "Content host registered");
        host
    }

    pub fn add_product(&self, mut product: Product) -> Product {
        product.id = self.allocate_id();
        product.integrations = self.deployment.intersect(&product.integrations);
        self.products.insert(product.id, product.clone());
        debug!(owner = %product.owner_ref(), name = %product.name, "Product registered");
        product
    }

    pub fn add_repository(&self, mut repository: Repository) -> Repository {
        repository.id = self.allocate_id();
        repository.integrations = self.deployment.intersect(&repository.integrations);
        self.repositories.insert(repository.id, repository.clone());
        debug!(owner = %repository.owner_ref(), name = %repository.name, "Repository registered");
        repository
    }

    pub fn content_host(&self, id: i64) -> Option<ContentHost> {
        self.content_hosts.get(&id).map(|entry| entry.value().clone())
    }

    pub fn product(&self, id: i64) -> Option<Product> {
        self.products.get(&id).map(|entry| entry.value().clone())
    }

    pub fn repository(&self, id: i64) -> Option<Repository> {
        self.repositories.get(&id).map(|entry| entry.value().clone())
    }

    /// Repositories belonging to a product, ordered by id
    pub fn product_repositories(&self, product_id: i64) -> Vec<Repository> {
        let mut repositories: Vec<Repository> = self
            .repositories
            .iter()
            .filter(|entry| entry.value().product_id == Some(product_id))
            .map(|entry| entry.value().clone())
            .collect();
        repositories.sort_by_key(|repository| repository.id);
        repositories
    }

    /// Apply `update` to a repository in place; false when it does not exist
    pub fn update_repository(&self, id: i64, update: impl FnOnce(&mut Repository)) -> bool {
        match self.repositories.get_mut(&id) {
            Some(mut entry) => {
                update(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn update_product(&self, id: i64, update: impl FnOnce(&mut Product)) -> bool {
        match self.products.get_mut(&id) {
            Some(mut entry) => {
                update(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, owner: OwnerRef) -> bool {
        match owner.kind {
            OwnerKind::System => self.content_hosts.contains_key(&owner.id),
            OwnerKind::Product => self.products.contains_key(&owner.id),
            OwnerKind::Repository => self.repositories.contains_key(&owner.id),
        }
    }

    /// Resolved integration flags of an owner
    pub fn integrations_of(&self, owner: OwnerRef) -> Option<Integrations> {
        match owner.kind {
            OwnerKind::System => self.content_hosts.get(&owner.id).map(|e| e.integrations),
            OwnerKind::Product => self.products.get(&owner.id).map(|e| e.integrations),
            OwnerKind::Repository => self.repositories.get(&owner.id).map(|e| e.integrations),
        }
    }

    /// Identifier of the owner inside the remote services
    pub fn remote_target(&self, owner: OwnerRef) -> Option<String> {
        match owner.kind {
            OwnerKind::System => self.content_hosts.get(&owner.id).map(|e| e.uuid.to_string()),
            OwnerKind::Product => self.products.get(&owner.id).map(|e| e.label.clone()),
            OwnerKind::Repository => self.repositories.get(&owner.id).map(|e| e.pulp_id.clone()),
        }
    }

    /// Drop an entity from the arena; true when it existed
    pub fn remove(&self, owner: OwnerRef) -> bool {
        let removed = match owner.kind {
            OwnerKind::System => self.content_hosts.remove(&owner.id).is_some(),
            OwnerKind::Product => self.products.remove(&owner.id).is_some(),
            OwnerKind::Repository => self.repositories.remove(&owner.id).is_some(),
        };
        if removed {
            debug!(owner = %owner, "Owner removed from registry");
        }
        removed
    }
}
