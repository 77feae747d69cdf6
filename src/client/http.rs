//! # HTTP Remote Client
//!
//! JSON-over-HTTP client for a remote subsystem:
//!
//! - `POST {base}/actions/{action}` with `{target, args}` answers `{correlation_id, status, result?}`
//! - `GET {base}/jobs/{correlation_id}` answers `{state, result?}`

use super::errors::{RemoteError, RemoteResult};
use super::traits::RemoteActionClient;
use super::types::{RemoteAction, RemoteHandle, RemoteService, RemoteStatus};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    service: RemoteService,
    base_url: Url,
    http: Client,
}

impl HttpRemoteClient {
    /// Build a client; `timeout` bounds every request made by it
    pub fn new(service: RemoteService, base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            RemoteError::protocol(service, format!("invalid base url {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::protocol(
                service,
                format!("{base_url} cannot be used as a base url"),
            ));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::protocol(service, format!("http client: {e}")))?;

        Ok(Self {
            service,
            base_url,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                RemoteError::protocol(self.service, "base url cannot carry a path")
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error, querying: bool) -> RemoteError {
        if err.is_timeout() && querying {
            return RemoteError::Timeout {
                service: self.service,
            };
        }
        RemoteError::unavailable(self.service, err.to_string())
    }
}

#[async_trait]
impl RemoteActionClient for HttpRemoteClient {
    fn service(&self) -> RemoteService {
        self.service
    }

    async fn dispatch(&self, action: &RemoteAction) -> RemoteResult<RemoteHandle> {
        let url = self.endpoint(&["actions", &action.action])?;
        debug!(service = %self.service, url = %url, target = %action.target, "Dispatching remote action");

        let response = self
            .http
            .post(url)
            .json(&json!({ "target": action.target, "args": action.args }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e, false))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::rejected(
                self.service,
                format!("HTTP {status}: {body}"),
            ));
        }
        if !status.is_success() {
            warn!(service = %self.service, status = %status, "Remote dispatch failed");
            return Err(RemoteError::unavailable(self.service, format!("HTTP {status}")));
        }

        response
            .json::<RemoteHandle>()
            .await
            .map_err(|e| RemoteError::protocol(self.service, format!("dispatch response: {e}")))
    }

    async fn query(&self, correlation_id: &str) -> RemoteResult<RemoteStatus> {
        let url = self.endpoint(&["jobs", correlation_id])?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, true))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(RemoteError::NotFound {
                service: self.service,
                correlation_id: correlation_id.to_string(),
            }),
            status if status.is_server_error() => Err(RemoteError::unavailable(
                self.service,
                format!("HTTP {status}"),
            )),
            status if !status.is_success() => Err(RemoteError::protocol(
                self.service,
                format!("unexpected HTTP {status}"),
            )),
            _ => response
                .json::<RemoteStatus>()
                .await
                .map_err(|e| RemoteError::protocol(self.service, format!("status response: {e}"))),
        }
    }

    fn client_name(&self) -> &'static str {
        "http"
    }
}
