//! # PostgreSQL Task Store
//!
//! [`TaskRecordStore`] over the `katello_task_statuses` table. Transitions run in a
//! transaction that holds the record's row lock (`SELECT ... FOR UPDATE`).

use crate::models::{NewTaskRecord, OwnerKind, OwnerRef, TaskId, TaskRecord};
use crate::state_machine::persistence::apply_transition;
use crate::state_machine::{
    PersistenceError, PersistenceResult, TaskRecordStore, TaskState, TransitionOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, uuid, task_type, state, parameters, owner_kind, owner_id, \
     remote_action, result, created_at, started_at, finished_at, refreshed_at \
     FROM katello_task_statuses";

/// Raw row as stored; converted into a [`TaskRecord`] with validation
#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: i64,
    uuid: Option<String>,
    task_type: String,
    state: String,
    parameters: Value,
    owner_kind: String,
    owner_id: i64,
    remote_action: Value,
    result: Option<Value>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = PersistenceError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let task_id = TaskId(row.id);
        let corrupt = |reason: String| PersistenceError::Corrupt { task_id, reason };

        Ok(TaskRecord {
            id: task_id,
            uuid: row.uuid,
            task_type: row.task_type.parse().map_err(corrupt)?,
            state: row.state.parse().map_err(corrupt)?,
            parameters: serde_json::from_value(row.parameters)
                .map_err(|e| corrupt(format!("parameters: {e}")))?,
            owner: OwnerRef::new(row.owner_kind.parse::<OwnerKind>().map_err(corrupt)?, row.owner_id),
            remote_action: serde_json::from_value(row.remote_action)
                .map_err(|e| corrupt(format!("remote_action: {e}")))?,
            result: row.result,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            refreshed_at: row.refreshed_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error, uuid: Option<&str>) -> PersistenceError {
    match (&err, uuid) {
        (sqlx::Error::Database(db), Some(uuid)) if db.is_unique_violation() => {
            PersistenceError::DuplicateCorrelationId {
                uuid: uuid.to_string(),
            }
        }
        _ => PersistenceError::Database(err),
    }
}

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRecordStore for PgTaskStore {
    async fn create(&self, record: NewTaskRecord) -> PersistenceResult<TaskRecord> {
        let validated = record.validate()?;
        let now = Utc::now();
        let started_at = (validated.state != TaskState::Waiting).then_some(now);

        let row = sqlx::query_as::<_, TaskRow>(
            "INSERT INTO katello_task_statuses \
             (uuid, task_type, state, parameters, owner_kind, owner_id, remote_action, created_at, started_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, uuid, task_type, state, parameters, owner_kind, owner_id, \
             remote_action, result, created_at, started_at, finished_at, refreshed_at",
        )
        .bind(validated.uuid.as_deref())
        .bind(validated.task_type.as_str())
        .bind(validated.state.as_str())
        .bind(serde_json::to_value(&validated.parameters)?)
        .bind(validated.owner.kind.as_str())
        .bind(validated.owner.id)
        .bind(serde_json::to_value(&validated.remote_action)?)
        .bind(now)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, validated.uuid.as_deref()))?;

        let record = TaskRecord::try_from(row)?;
        debug!(task_id = %record.id, task_type = %record.task_type, owner = %record.owner, "Task record created");
        Ok(record)
    }

    async fn find(&self, id: TaskId) -> PersistenceResult<TaskRecord> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found(format!("id {id}")))?;
        TaskRecord::try_from(row)
    }

    async fn find_by_remote_id(&self, uuid: &str) -> PersistenceResult<TaskRecord> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE uuid = $1"))
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found(format!("correlation id {uuid}")))?;
        TaskRecord::try_from(row)
    }

    async fn transition(
        &self,
        id: TaskId,
        to: TaskState,
        result: Option<Value>,
    ) -> PersistenceResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"))
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PersistenceError::not_found(format!("id {id}")))?;
        let mut record = TaskRecord::try_from(row)?;

        let outcome = apply_transition(&mut record, to, result, Utc::now())?;
        if let TransitionOutcome::Applied { record, .. } = &outcome {
            sqlx::query(
                "UPDATE katello_task_statuses \
                 SET state = $2, result = $3, started_at = $4, finished_at = $5 \
                 WHERE id = $1",
            )
            .bind(id.0)
            .bind(record.state.as_str())
            .bind(record.result.clone())
            .bind(record.started_at)
            .bind(record.finished_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn attach_remote_id(&self, id: TaskId, uuid: &str) -> PersistenceResult<TaskRecord> {
        if uuid.trim().is_empty() {
            return Err(PersistenceError::validation(
                "uuid",
                "correlation id must not be blank",
            ));
        }

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"))
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PersistenceError::not_found(format!("id {id}")))?;
        let mut record = TaskRecord::try_from(row)?;

        match record.uuid.as_deref() {
            Some(existing) if existing == uuid => {}
            Some(existing) => {
                return Err(PersistenceError::validation(
                    "uuid",
                    format!("task {id} already has correlation id {existing}"),
                ))
            }
            None => {
                sqlx::query("UPDATE katello_task_statuses SET uuid = $2 WHERE id = $1")
                    .bind(id.0)
                    .bind(uuid)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_unique_violation(e, Some(uuid)))?;
                record.uuid = Some(uuid.to_string());
            }
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn mark_refreshed(&self, id: TaskId, at: DateTime<Utc>) -> PersistenceResult<()> {
        let updated = sqlx::query("UPDATE katello_task_statuses SET refreshed_at = $2 WHERE id = $1")
            .bind(id.0)
            .bind(at)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(PersistenceError::not_found(format!("id {id}")));
        }
        Ok(())
    }

    async fn list_for_owner(&self, owner: OwnerRef) -> PersistenceResult<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{SELECT_COLUMNS} WHERE owner_kind = $1 AND owner_id = $2 ORDER BY id"
        ))
        .bind(owner.kind.as_str())
        .bind(owner.id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn list_in_flight(&self, limit: usize) -> PersistenceResult<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{SELECT_COLUMNS} WHERE state IN ('waiting', 'running') ORDER BY id LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn delete_for_owner(&self, owner: OwnerRef) -> PersistenceResult<usize> {
        let removed = sqlx::query(
            "DELETE FROM katello_task_statuses WHERE owner_kind = $1 AND owner_id = $2",
        )
        .bind(owner.kind.as_str())
        .bind(owner.id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }
}
