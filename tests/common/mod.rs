//! Shared fixtures for the integration tests: a scripted remote client, a
//! counting terminal hook and a fully wired in-memory orchestrator.
#![allow(dead_code)]

use async_trait::async_trait;
use katello_tasks::client::{
    RemoteAction, RemoteActionClient, RemoteClients, RemoteError, RemoteHandle, RemoteJobState,
    RemoteResult, RemoteService, RemoteStatus,
};
use katello_tasks::database::InMemoryTaskStore;
use katello_tasks::models::{ContentHost, Product, Repository, TaskId};
use katello_tasks::orchestration::{
    register_builtin_hooks, OrchestratorSettings, OwnerActions, TaskOrchestrator,
};
use katello_tasks::registry::{HookRegistry, HookResult, OwnerRegistry, TerminalHook, TerminalNotice};
use katello_tasks::state_machine::TaskRecordStore;
use katello_tasks::TaskState;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    dispatch_results: VecDeque<RemoteResult<RemoteHandle>>,
    query_results: HashMap<String, RemoteResult<RemoteStatus>>,
    dispatched: Vec<RemoteAction>,
    queried: Vec<String>,
    dispatch_delay: Option<Duration>,
    next_id: usize,
}

/// Remote client whose answers are queued by the test
#[derive(Debug, Clone)]
pub struct ScriptedClient {
    service: RemoteService,
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new(service: RemoteService) -> Self {
        Self {
            service,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn push_dispatch(&self, result: RemoteResult<RemoteHandle>) {
        self.script.lock().dispatch_results.push_back(result);
    }

    pub fn accept(&self, correlation_id: &str, status: RemoteJobState) {
        self.push_dispatch(Ok(RemoteHandle::new(correlation_id, status)));
    }

    pub fn set_query(&self, correlation_id: &str, result: RemoteResult<RemoteStatus>) {
        self.script
            .lock()
            .query_results
            .insert(correlation_id.to_string(), result);
    }

    pub fn delay_dispatch(&self, delay: Duration) {
        self.script.lock().dispatch_delay = Some(delay);
    }

    pub fn dispatched(&self) -> Vec<RemoteAction> {
        self.script.lock().dispatched.clone()
    }

    pub fn queried(&self) -> Vec<String> {
        self.script.lock().queried.clone()
    }
}

#[async_trait]
impl RemoteActionClient for ScriptedClient {
    fn service(&self) -> RemoteService {
        self.service
    }

    /// Unscripted dispatches are accepted as `waiting` with a generated id
    async fn dispatch(&self, action: &RemoteAction) -> RemoteResult<RemoteHandle> {
        let delay = self.script.lock().dispatch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock();
        script.dispatched.push(action.clone());
        match script.dispatch_results.pop_front() {
            Some(result) => result,
            None => {
                script.next_id += 1;
                Ok(RemoteHandle::new(
                    format!("{}-{}", self.service, script.next_id),
                    RemoteJobState::Waiting,
                ))
            }
        }
    }

    async fn query(&self, correlation_id: &str) -> RemoteResult<RemoteStatus> {
        let mut script = self.script.lock();
        script.queried.push(correlation_id.to_string());
        script
            .query_results
            .get(correlation_id)
            .cloned()
            .unwrap_or_else(|| Err(RemoteError::Timeout { service: self.service }))
    }

    fn client_name(&self) -> &'static str {
        "scripted"
    }
}

/// Records every terminal notice it receives
#[derive(Debug, Default)]
pub struct CountingHook {
    notices: Mutex<Vec<TerminalNotice>>,
}

impl CountingHook {
    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn count_for(&self, task_id: TaskId) -> usize {
        self.notices.lock().iter().filter(|n| n.task_id == task_id).count()
    }

    pub fn last_state(&self) -> Option<TaskState> {
        self.notices.lock().last().map(|n| n.final_state)
    }
}

#[async_trait]
impl TerminalHook for CountingHook {
    async fn on_terminal(&self, notice: &TerminalNotice) -> HookResult<()> {
        self.notices.lock().push(notice.clone());
        Ok(())
    }

    fn hook_name(&self) -> &'static str {
        "counting"
    }
}

pub fn test_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        dispatch_timeout: Duration::from_millis(200),
        query_timeout: Duration::from_millis(200),
        freshness: chrono::Duration::zero(),
        refresh_concurrency: 4,
    }
}

/// Orchestrator over an in-memory store with scripted content-sync and entitlement clients
pub struct Harness {
    pub store: Arc<InMemoryTaskStore>,
    pub owners: Arc<OwnerRegistry>,
    pub hooks: Arc<HookRegistry>,
    pub counter: Arc<CountingHook>,
    pub content: ScriptedClient,
    pub entitlement: ScriptedClient,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub actions: OwnerActions,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let owners = Arc::new(OwnerRegistry::default());
        let hooks = Arc::new(HookRegistry::new());
        let counter = Arc::new(CountingHook::default());

        let content = ScriptedClient::new(RemoteService::ContentSync);
        let entitlement = ScriptedClient::new(RemoteService::Entitlement);
        let clients = RemoteClients::new()
            .with_client(Arc::new(content.clone()))
            .with_client(Arc::new(entitlement.clone()));
        register_builtin_hooks(&hooks, &owners, &clients);
        hooks.register_for_all(Arc::clone(&counter) as Arc<dyn TerminalHook>);

        let orchestrator = Arc::new(TaskOrchestrator::new(
            Arc::clone(&store) as Arc<dyn TaskRecordStore>,
            clients,
            Arc::clone(&owners),
            Arc::clone(&hooks),
            settings,
        ));
        let actions = OwnerActions::new(Arc::clone(&orchestrator));

        Self {
            store,
            owners,
            hooks,
            counter,
            content,
            entitlement,
            orchestrator,
            actions,
        }
    }

    pub fn repository(&self) -> Repository {
        self.owners
            .add_repository(Repository::new("zoo-el9", "zoo_el9").with_feed_url("http://mirror.example.com/zoo"))
    }

    pub fn product_with_repositories(&self) -> (Product, Vec<Repository>) {
        let product = self.owners.add_product(Product::new("Zoo", "zoo"));
        let repositories = vec![
            self.owners.add_repository(
                Repository::new("zoo-el8", "zoo_el8")
                    .with_product(product.id)
                    .with_feed_url("http://mirror.example.com/zoo8"),
            ),
            self.owners.add_repository(
                Repository::new("zoo-el9", "zoo_el9")
                    .with_product(product.id)
                    .with_feed_url("http://mirror.example.com/zoo9"),
            ),
        ];
        (product, repositories)
    }

    pub fn content_host(&self) -> ContentHost {
        self.owners.add_content_host(ContentHost::new("web01.example.com"))
    }
}
