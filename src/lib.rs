#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Katello Tasks
//!
//! Asynchronous task orchestration for Katello content lifecycle management.
//!
//! ## Overview
//!
//! Repository syncs, package operations on content hosts and subscription
//! refreshes run on remote services (content sync, entitlement, indexing).
//! This crate dispatches that work, persists a tracking record per remote job
//! and reconciles the record with the remote state through completion
//! callbacks and on-demand or periodic re-queries.
//!
//! ## Module Organization
//!
//! - [`models`] - task records, task types and owner entities
//! - [`state_machine`] - forward-only task lifecycle and the store seam
//! - [`database`] - in-memory and PostgreSQL task stores
//! - [`client`] - remote action clients
//! - [`orchestration`] - dispatch, refresh, owner actions and the poll sweeper
//! - [`registry`] - owner arena and terminal hooks
//! - [`web`] - axum surface: sync callback, task listing, health
//! - [`config`] - layered deployment configuration
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use katello_tasks::database::InMemoryTaskStore;
//! use katello_tasks::client::{HttpRemoteClient, RemoteClients, RemoteService};
//! use katello_tasks::orchestration::{OrchestratorSettings, OwnerActions, TaskOrchestrator};
//! use katello_tasks::registry::{HookRegistry, OwnerRegistry};
//! use katello_tasks::models::Repository;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pulp = HttpRemoteClient::new(
//!     RemoteService::ContentSync,
//!     "https://pulp.example.com/pulp/api/v2/",
//!     Duration::from_secs(10),
//! )?;
//! let owners = Arc::new(OwnerRegistry::default());
//! let repo = owners.add_repository(Repository::new("zoo", "zoo").with_feed_url("http://mirror/zoo"));
//!
//! let orchestrator = Arc::new(TaskOrchestrator::new(
//!     Arc::new(InMemoryTaskStore::new()),
//!     RemoteClients::new().with_client(Arc::new(pulp)),
//!     owners,
//!     Arc::new(HookRegistry::new()),
//!     OrchestratorSettings::default(),
//! ));
//! let actions = OwnerActions::new(orchestrator);
//! let record = actions.sync_repository(repo.id).await?;
//! println!("task {} is {}", record.id, record.state);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;
pub mod web;

pub use config::{ConfigManager, KatelloConfig};
pub use error::{KatelloError, Result};
pub use models::{OwnerRef, TaskId, TaskRecord, TaskType};
pub use orchestration::{OwnerActions, TaskOrchestrator};
pub use state_machine::{TaskRecordStore, TaskState, TransitionOutcome};
