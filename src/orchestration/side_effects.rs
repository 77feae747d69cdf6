//! # Built-in Terminal Hooks
//!
//! Owner-specific side effects of finished tasks.

use crate::client::{RemoteAction, RemoteClients, RemoteService};
use crate::models::TaskType;
use crate::registry::{HookError, HookRegistry, HookResult, OwnerRegistry, TerminalHook, TerminalNotice};
use crate::state_machine::TaskState;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Successful sync stamps `last_synced_at`; a failed one keeps the error payload
pub struct RepositorySyncHook {
    owners: Arc<OwnerRegistry>,
}

impl RepositorySyncHook {
    pub fn new(owners: Arc<OwnerRegistry>) -> Self {
        Self { owners }
    }
}

#[async_trait]
impl TerminalHook for RepositorySyncHook {
    async fn on_terminal(&self, notice: &TerminalNotice) -> HookResult<()> {
        let finished = Utc::now();
        let updated = self.owners.update_repository(notice.owner.id, |repo| {
            match notice.final_state {
                TaskState::Success => {
                    repo.last_synced_at = Some(finished);
                    repo.last_sync_error = None;
                }
                TaskState::Error => repo.last_sync_error = notice.result.clone(),
                _ => {}
            }
        });
        if !updated {
            return Err(HookError::OwnerMissing(notice.owner));
        }
        debug!(owner = %notice.owner, state = %notice.final_state, "Repository sync status updated");
        Ok(())
    }

    fn hook_name(&self) -> &'static str {
        "repository_sync"
    }
}

/// Product sync updates the product and every repository it contains
pub struct ProductSyncHook {
    owners: Arc<OwnerRegistry>,
}

impl ProductSyncHook {
    pub fn new(owners: Arc<OwnerRegistry>) -> Self {
        Self { owners }
    }
}

#[async_trait]
impl TerminalHook for ProductSyncHook {
    async fn on_terminal(&self, notice: &TerminalNotice) -> HookResult<()> {
        let finished = Utc::now();
        let succeeded = notice.final_state == TaskState::Success;
        if !matches!(notice.final_state, TaskState::Success | TaskState::Error) {
            return Ok(());
        }

        let updated = self.owners.update_product(notice.owner.id, |product| {
            if succeeded {
                product.last_synced_at = Some(finished);
                product.last_sync_error = None;
            } else {
                product.last_sync_error = notice.result.clone();
            }
        });
        if !updated {
            return Err(HookError::OwnerMissing(notice.owner));
        }

        for repository in self.owners.product_repositories(notice.owner.id) {
            if repository.syncable_feed().is_none() {
                continue;
            }
            self.owners.update_repository(repository.id, |repo| {
                if succeeded {
                    repo.last_synced_at = Some(finished);
                    repo.last_sync_error = None;
                } else {
                    repo.last_sync_error = notice.result.clone();
                }
            });
        }
        Ok(())
    }

    fn hook_name(&self) -> &'static str {
        "product_sync"
    }
}

/// Best-effort search index refresh for owners that participate in indexing
pub struct IndexingHook {
    owners: Arc<OwnerRegistry>,
    clients: RemoteClients,
}

impl IndexingHook {
    pub const ACTION: &'static str = "index.refresh";

    pub fn new(owners: Arc<OwnerRegistry>, clients: RemoteClients) -> Self {
        Self { owners, clients }
    }
}

#[async_trait]
impl TerminalHook for IndexingHook {
    async fn on_terminal(&self, notice: &TerminalNotice) -> HookResult<()> {
        if notice.final_state != TaskState::Success {
            return Ok(());
        }
        let Some(client) = self.clients.get(RemoteService::Indexing) else {
            return Ok(());
        };
        let participates = self
            .owners
            .integrations_of(notice.owner)
            .is_some_and(|integrations| integrations.indexing);
        if !participates {
            return Ok(());
        }

        let action = RemoteAction::new(
            Self::ACTION,
            notice.owner.to_string(),
            json!({ "task_type": notice.task_type, "task_id": notice.task_id }),
        );
        client.dispatch(&action).await?;
        Ok(())
    }

    fn hook_name(&self) -> &'static str {
        "indexing"
    }
}

/// Register the built-in hooks
pub fn register_builtin_hooks(hooks: &HookRegistry, owners: &Arc<OwnerRegistry>, clients: &RemoteClients) {
    hooks.register(TaskType::RepositorySync, Arc::new(RepositorySyncHook::new(Arc::clone(owners))));
    hooks.register(TaskType::ProductSync, Arc::new(ProductSyncHook::new(Arc::clone(owners))));

    // Owners whose content changed are reindexed
    if owners.deployment().indexing {
        hooks.register_for_all(Arc::new(IndexingHook::new(Arc::clone(owners), clients.clone())));
    }
    debug!(indexing = owners.deployment().indexing, "Built-in terminal hooks registered");
}
