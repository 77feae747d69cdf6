//! # In-Memory Task Store
//!
//! Process-local [`TaskRecordStore`]. Each record sits behind its own mutex, which
//! is the per-record guard; the correlation index enforces one record per remote job.

use crate::models::{NewTaskRecord, OwnerRef, TaskId, TaskRecord};
use crate::state_machine::persistence::apply_transition;
use crate::state_machine::{
    PersistenceError, PersistenceResult, TaskRecordStore, TaskState, TransitionOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct InMemoryTaskStore {
    records: DashMap<TaskId, Arc<Mutex<TaskRecord>>>,
    by_uuid: DashMap<String, TaskId>,
    next_id: AtomicI64,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_uuid: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn slot(&self, id: TaskId) -> PersistenceResult<Arc<Mutex<TaskRecord>>> {
        self.records
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PersistenceError::not_found(format!("id {id}")))
    }

    fn snapshot(&self) -> Vec<TaskRecord> {
        let slots: Vec<_> = self
            .records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut records: Vec<_> = slots.iter().map(|slot| slot.lock().clone()).collect();
        records.sort_by_key(|record| record.id);
        records
    }
}

#[async_trait]
impl TaskRecordStore for InMemoryTaskStore {
    async fn create(&self, record: NewTaskRecord) -> PersistenceResult<TaskRecord> {
        let validated = record.validate()?;
        let now = Utc::now();

        let build = |id: TaskId| {
            let mut record = TaskRecord {
                id,
                uuid: validated.uuid.clone(),
                task_type: validated.task_type,
                state: TaskState::Waiting,
                parameters: validated.parameters.clone(),
                owner: validated.owner,
                remote_action: validated.remote_action.clone(),
                result: None,
                created_at: now,
                started_at: None,
                finished_at: None,
                refreshed_at: None,
            };
            if validated.state != TaskState::Waiting {
                record.apply_state(validated.state, None, now);
            }
            record
        };

        let record = match &validated.uuid {
            Some(uuid) => match self.by_uuid.entry(uuid.clone()) {
                Entry::Occupied(_) => {
                    return Err(PersistenceError::DuplicateCorrelationId { uuid: uuid.clone() })
                }
                Entry::Vacant(vacant) => {
                    let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
                    let record = build(id);
                    self.records.insert(id, Arc::new(Mutex::new(record.clone())));
                    vacant.insert(id);
                    record
                }
            },
            None => {
                let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let record = build(id);
                self.records.insert(id, Arc::new(Mutex::new(record.clone())));
                record
            }
        };

        debug!(task_id = %record.id, task_type = %record.task_type, owner = %record.owner, "Task record created");
        Ok(record)
    }

    async fn find(&self, id: TaskId) -> PersistenceResult<TaskRecord> {
        Ok(self.slot(id)?.lock().clone())
    }

    async fn find_by_remote_id(&self, uuid: &str) -> PersistenceResult<TaskRecord> {
        let id = self
            .by_uuid
            .get(uuid)
            .map(|entry| *entry.value())
            .ok_or_else(|| PersistenceError::not_found(format!("correlation id {uuid}")))?;
        self.find(id).await
    }

    async fn transition(
        &self,
        id: TaskId,
        to: TaskState,
        result: Option<Value>,
    ) -> PersistenceResult<TransitionOutcome> {
        let slot = self.slot(id)?;
        let mut record = slot.lock();
        apply_transition(&mut record, to, result, Utc::now())
    }

    async fn attach_remote_id(&self, id: TaskId, uuid: &str) -> PersistenceResult<TaskRecord> {
        if uuid.trim().is_empty() {
            return Err(PersistenceError::validation(
                "uuid",
                "correlation id must not be blank",
            ));
        }

        let slot = self.slot(id)?;
        let mut record = slot.lock();
        match record.uuid.as_deref() {
            Some(existing) if existing == uuid => return Ok(record.clone()),
            Some(existing) => {
                return Err(PersistenceError::validation(
                    "uuid",
                    format!("task {id} already has correlation id {existing}"),
                ))
            }
            None => {}
        }

        match self.by_uuid.entry(uuid.to_string()) {
            Entry::Occupied(_) => Err(PersistenceError::DuplicateCorrelationId {
                uuid: uuid.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(id);
                record.uuid = Some(uuid.to_string());
                Ok(record.clone())
            }
        }
    }

    async fn mark_refreshed(&self, id: TaskId, at: DateTime<Utc>) -> PersistenceResult<()> {
        self.slot(id)?.lock().refreshed_at = Some(at);
        Ok(())
    }

    async fn list_for_owner(&self, owner: OwnerRef) -> PersistenceResult<Vec<TaskRecord>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|record| record.owner == owner)
            .collect())
    }

    async fn list_in_flight(&self, limit: usize) -> PersistenceResult<Vec<TaskRecord>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|record| record.state.is_in_flight())
            .take(limit)
            .collect())
    }

    async fn delete_for_owner(&self, owner: OwnerRef) -> PersistenceResult<usize> {
        let doomed: Vec<TaskId> = self
            .snapshot()
            .into_iter()
            .filter(|record| record.owner == owner)
            .map(|record| record.id)
            .collect();

        for id in &doomed {
            if let Some((_, slot)) = self.records.remove(id) {
                if let Some(uuid) = slot.lock().uuid.clone() {
                    self.by_uuid.remove(&uuid);
                }
            }
        }

        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteJobState;
    use crate::models::{TaskParameters, TaskType};
    use serde_json::json;

    fn sync_request(uuid: Option<&str>) -> NewTaskRecord {
        let builder = NewTaskRecord::builder()
            .owner(OwnerRef::repository(1))
            .task_type(TaskType::RepositorySync)
            .parameters(TaskParameters::Sync {
                feed_url: "http://mirror.example.com/zoo".to_string(),
            });
        match uuid {
            Some(uuid) => builder.remote_handle(uuid, RemoteJobState::Waiting).build(),
            None => builder.build(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_correlation_id() {
        let store = InMemoryTaskStore::new();
        let record = store.create(sync_request(Some("R1"))).await.unwrap();

        assert_eq!(record.state, TaskState::Waiting);
        assert_eq!(store.find_by_remote_id("R1").await.unwrap().id, record.id);
        assert!(store.find_by_remote_id("R2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_running_handle_stamps_started_at() {
        let store = InMemoryTaskStore::new();
        let request = NewTaskRecord::builder()
            .owner(OwnerRef::system(4))
            .task_type(TaskType::PackageInstall)
            .parameters(TaskParameters::Packages(vec!["zsh".to_string()]))
            .remote_handle("J9", RemoteJobState::Running)
            .build();

        let record = store.create(request).await.unwrap();
        assert_eq!(record.state, TaskState::Running);
        assert!(record.started_at.is_some());
        assert!(record.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_one_record_per_correlation_id() {
        let store = InMemoryTaskStore::new();
        store.create(sync_request(Some("R1"))).await.unwrap();

        let err = store.create(sync_request(Some("R1"))).await.unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateCorrelationId { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_transition_outcomes() {
        let store = InMemoryTaskStore::new();
        let record = store.create(sync_request(Some("R1"))).await.unwrap();

        let unchanged = store.transition(record.id, TaskState::Waiting, None).await.unwrap();
        assert!(matches!(unchanged, TransitionOutcome::Unchanged(_)));

        let running = store.transition(record.id, TaskState::Running, None).await.unwrap();
        assert!(matches!(running, TransitionOutcome::Applied { from: TaskState::Waiting, .. }));

        let payload = json!({"status": "success"});
        let done = store
            .transition(record.id, TaskState::Success, Some(payload.clone()))
            .await
            .unwrap();
        assert!(done.is_terminal_application());
        assert_eq!(done.record().result, Some(payload.clone()));

        let again = store
            .transition(record.id, TaskState::Success, Some(payload))
            .await
            .unwrap();
        assert!(matches!(again, TransitionOutcome::Confirmed(_)));

        let err = store.transition(record.id, TaskState::Running, None).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidStateTransition { .. }));
        assert_eq!(store.find(record.id).await.unwrap().state, TaskState::Success);
    }

    #[tokio::test]
    async fn test_attach_remote_id_is_unique() {
        let store = InMemoryTaskStore::new();
        let first = store.create(sync_request(None)).await.unwrap();
        let second = store.create(sync_request(None)).await.unwrap();
        assert!(first.uuid.is_none());

        let attached = store.attach_remote_id(first.id, "R7").await.unwrap();
        assert_eq!(attached.uuid.as_deref(), Some("R7"));
        assert!(store.attach_remote_id(first.id, "R7").await.is_ok());

        let err = store.attach_remote_id(second.id, "R7").await.unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateCorrelationId { .. }));
        assert_eq!(store.find_by_remote_id("R7").await.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_in_flight_listing_and_cascade_delete() {
        let store = InMemoryTaskStore::new();
        let a = store.create(sync_request(Some("R1"))).await.unwrap();
        let b = store.create(sync_request(Some("R2"))).await.unwrap();
        store.transition(a.id, TaskState::Error, Some(json!({"error": "boom"}))).await.unwrap();

        let in_flight = store.list_in_flight(10).await.unwrap();
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].id, b.id);

        let removed = store.delete_for_owner(OwnerRef::repository(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty());
        assert!(store.find_by_remote_id("R2").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_terminal_transitions_apply_once() {
        let store = Arc::new(InMemoryTaskStore::new());
        let record = store.create(sync_request(Some("R1"))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let state = if i % 2 == 0 { TaskState::Success } else { TaskState::Error };
            handles.push(tokio::spawn(async move {
                store.transition(record.id, state, Some(json!({"attempt": i}))).await
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
        assert!(store.find(record.id).await.unwrap().is_terminal());
    }
}
