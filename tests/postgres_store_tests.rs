//! PgTaskStore against a real database.
//!
//! Needs `DATABASE_URL`; run with `cargo test -- --ignored`.
#![cfg(feature = "postgres")]

use katello_tasks::client::RemoteJobState;
use katello_tasks::database::PgTaskStore;
use katello_tasks::models::{NewTaskRecord, OwnerRef, TaskParameters, TaskType};
use katello_tasks::state_machine::{PersistenceError, TaskRecordStore, TransitionOutcome};
use katello_tasks::TaskState;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

fn install(owner: OwnerRef, uuid: Option<&str>) -> NewTaskRecord {
    let builder = NewTaskRecord::builder()
        .owner(owner)
        .task_type(TaskType::PackageInstall)
        .parameters(TaskParameters::Packages(vec!["zsh".to_string()]));
    match uuid {
        Some(uuid) => builder.remote_handle(uuid, RemoteJobState::Waiting).build(),
        None => builder.build(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_record_lifecycle(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let owner = OwnerRef::system(7);

    let record = store.create(install(owner, Some("R1"))).await.unwrap();
    assert_eq!(record.state, TaskState::Waiting);
    assert_eq!(store.find_by_remote_id("R1").await.unwrap().id, record.id);

    let duplicate = store.create(install(owner, Some("R1"))).await.unwrap_err();
    assert!(matches!(duplicate, PersistenceError::DuplicateCorrelationId { .. }));

    let running = store.transition(record.id, TaskState::Running, None).await.unwrap();
    assert!(matches!(running, TransitionOutcome::Applied { from: TaskState::Waiting, .. }));

    let result = Some(json!({"installed": ["zsh"]}));
    let done = store.transition(record.id, TaskState::Success, result.clone()).await.unwrap();
    assert!(done.is_terminal_application());
    let again = store.transition(record.id, TaskState::Success, result).await.unwrap();
    assert!(matches!(again, TransitionOutcome::Confirmed(_)));

    let regress = store.transition(record.id, TaskState::Running, None).await.unwrap_err();
    assert!(matches!(regress, PersistenceError::InvalidStateTransition { .. }));

    assert_eq!(store.delete_for_owner(owner).await.unwrap(), 1);
    assert!(store.find(record.id).await.unwrap_err().is_not_found());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_completions_apply_once(pool: PgPool) {
    let store = Arc::new(PgTaskStore::new(pool));
    let record = store.create(install(OwnerRef::system(1), Some("C1"))).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.transition(record.id, TaskState::Success, None).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if let Ok(outcome) = handle.await.unwrap() {
            if outcome.is_terminal_application() {
                applied += 1;
            }
        }
    }
    assert_eq!(applied, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_deferred_record_gets_correlation_id(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let record = store.create(install(OwnerRef::system(2), None)).await.unwrap();
    assert!(record.uuid.is_none());

    let in_flight = store.list_in_flight(10).await.unwrap();
    assert_eq!(in_flight.len(), 1);

    let attached = store.attach_remote_id(record.id, "late-1").await.unwrap();
    assert_eq!(attached.uuid.as_deref(), Some("late-1"));
    assert_eq!(store.find_by_remote_id("late-1").await.unwrap().id, record.id);
}
