//! # Poll Sweeper
//!
//! Background loop that refreshes in-flight records on a fixed interval so tasks
//! advance even when nobody reads them and no callback arrives.

use super::errors::OrchestrationResult;
use super::orchestrator::TaskOrchestrator;
use super::refresh::RefreshReport;
use crate::config::RefreshConfig;
use crate::logging::log_error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct PollSweeper {
    orchestrator: Arc<TaskOrchestrator>,
    interval: Duration,
    batch_size: usize,
}

impl PollSweeper {
    pub fn new(orchestrator: Arc<TaskOrchestrator>, interval: Duration, batch_size: usize) -> Self {
        Self {
            orchestrator,
            interval,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(orchestrator: Arc<TaskOrchestrator>, config: &RefreshConfig) -> Self {
        Self::new(orchestrator, config.sweep_interval(), config.sweep_batch_size)
    }

    /// Refresh up to `batch_size` in-flight records, oldest first
    pub async fn sweep_once(&self) -> OrchestrationResult<RefreshReport> {
        let ids: Vec<_> = self
            .orchestrator
            .store()
            .list_in_flight(self.batch_size)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        if ids.is_empty() {
            return Ok(RefreshReport::default());
        }

        let report = self.orchestrator.refresh_batch(&ids).await;
        debug!(
            swept = report.len(),
            advanced = report.advanced_count(),
            failed = report.failures().count(),
            "Poll sweep finished"
        );
        Ok(report)
    }

    /// Sweep every interval until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), batch_size = self.batch_size, "🧹 Poll sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        log_error("poll_sweeper", "sweep", &e.to_string(), None);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poll sweeper stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
