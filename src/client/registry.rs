//! # Remote Client Capability Set
//!
//! One optional client per remote subsystem, populated once at startup from the
//! deployment's integration flags.

use super::errors::RemoteResult;
use super::http::HttpRemoteClient;
use super::traits::RemoteActionClient;
use super::types::RemoteService;
use crate::config::RemoteConfig;
use crate::models::Integrations;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Default)]
pub struct RemoteClients {
    content_sync: Option<Arc<dyn RemoteActionClient>>,
    entitlement: Option<Arc<dyn RemoteActionClient>>,
    indexing: Option<Arc<dyn RemoteActionClient>>,
}

impl fmt::Debug for RemoteClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClients")
            .field("content_sync", &self.content_sync.is_some())
            .field("entitlement", &self.entitlement.is_some())
            .field("indexing", &self.indexing.is_some())
            .finish()
    }
}

impl RemoteClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a client in the slot of the service it reports
    pub fn with_client(mut self, client: Arc<dyn RemoteActionClient>) -> Self {
        let slot = match client.service() {
            RemoteService::ContentSync => &mut self.content_sync,
            RemoteService::Entitlement => &mut self.entitlement,
            RemoteService::Indexing => &mut self.indexing,
        };
        *slot = Some(client);
        self
    }

    pub fn get(&self, service: RemoteService) -> Option<&Arc<dyn RemoteActionClient>> {
        match service {
            RemoteService::ContentSync => self.content_sync.as_ref(),
            RemoteService::Entitlement => self.entitlement.as_ref(),
            RemoteService::Indexing => self.indexing.as_ref(),
        }
    }

    /// Capabilities backed by an installed client
    pub fn available(&self) -> Integrations {
        RemoteService::ALL
            .into_iter()
            .fold(Integrations::none(), |acc, service| {
                if self.get(service).is_some() {
                    acc.with(service)
                } else {
                    acc
                }
            })
    }

    /// Build HTTP clients for every enabled integration that has a base url
    pub fn from_config(remote: &RemoteConfig, integrations: &Integrations) -> RemoteResult<Self> {
        let timeout = Duration::from_millis(remote.dispatch_timeout_ms.max(remote.query_timeout_ms));
        let mut clients = Self::new();

        for service in RemoteService::ALL {
            if !integrations.participates_in(service) {
                continue;
            }
            if let Some(base_url) = remote.base_url(service) {
                let client = HttpRemoteClient::new(service, base_url, timeout)?;
                info!(service = %service, client = client.client_name(), "🔌 Remote client configured");
                clients = clients.with_client(Arc::new(client));
            }
        }

        Ok(clients)
    }
}
