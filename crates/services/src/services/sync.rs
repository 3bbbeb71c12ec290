use db::{
    DBService, DatabaseTransaction, TransactionTrait,
    models::sync_operation::{CreateSyncOperation, SyncOperation},
    types::{SyncEntityType, SyncOperationKind, SyncResult, TaskStatus},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::services::{
    error::ServiceError,
    tasks::{CreateTaskInput, DeleteTaskInput, TaskService, UpdateTaskInput},
};

/// One client-generated mutation inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperationInput {
    pub op_id: String,
    pub entity_type: SyncEntityType,
    pub operation: SyncOperationKind,
    #[serde(default)]
    pub entity_client_id: Option<String>,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub base_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatchRequest {
    pub device_id: String,
    pub operations: Vec<SyncOperationInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperationOutcome {
    pub op_id: String,
    pub result: SyncResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    workspace_id: Option<Uuid>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_rev: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateTaskPayload {
    task_id: Uuid,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteTaskPayload {
    task_id: Uuid,
}

/// Typed dispatch target, parsed once at the batch boundary.
enum SyncPayload {
    CreateTask(CreateTaskPayload),
    MutateTask(MutateTaskPayload),
    DeleteTask(DeleteTaskPayload),
    /// `restore`/`revert`: accepted vocabulary with no handler yet.
    Reserved,
}

/// Reconciles device batches against server state. Every operation resolves
/// to exactly one ledgered outcome; replays of a decided `(device, op)` pair
/// are pure reads.
#[derive(Clone)]
pub struct SyncService {
    db: DBService,
    tasks: TaskService,
}

impl SyncService {
    pub fn new(db: DBService, tasks: TaskService) -> Self {
        Self { db, tasks }
    }

    /// Entry point for a full inbound batch request.
    pub async fn apply_request(
        &self,
        user_id: Uuid,
        request: &SyncBatchRequest,
    ) -> Result<Vec<SyncOperationOutcome>, ServiceError> {
        if request.device_id.trim().is_empty() {
            return Err(ServiceError::Validation("deviceId is required".to_string()));
        }
        self.apply_batch(user_id, &request.device_id, &request.operations)
            .await
    }

    /// Applies a batch strictly in input order, one operation fully resolved
    /// before the next begins; a later operation may depend on an earlier
    /// one's commit.
    pub async fn apply_batch(
        &self,
        user_id: Uuid,
        device_id: &str,
        operations: &[SyncOperationInput],
    ) -> Result<Vec<SyncOperationOutcome>, ServiceError> {
        let mut results = Vec::with_capacity(operations.len());
        for op in operations {
            let result = self.apply_operation(user_id, device_id, op).await?;
            results.push(SyncOperationOutcome {
                op_id: op.op_id.clone(),
                result,
            });
        }
        Ok(results)
    }

    async fn apply_operation(
        &self,
        user_id: Uuid,
        device_id: &str,
        op: &SyncOperationInput,
    ) -> Result<SyncResult, ServiceError> {
        let txn = self.db.pool.begin().await?;

        if let Some(decided) =
            SyncOperation::find_by_device_and_op(&txn, device_id, &op.op_id).await?
        {
            txn.commit().await?;
            tracing::debug!(
                device_id,
                op_id = %op.op_id,
                result = %decided.result,
                "operation already decided; returning stored result"
            );
            return Ok(decided.result);
        }

        let attempt = match parse_payload(op) {
            Ok(payload) => self.dispatch(&txn, user_id, device_id, op, payload).await,
            Err(err) => Err(err),
        };

        let result = match attempt {
            Ok(()) => SyncResult::Applied,
            Err(ServiceError::Conflict { .. }) => SyncResult::Conflict,
            Err(ServiceError::Database(err)) => {
                tracing::error!(
                    device_id,
                    op_id = %op.op_id,
                    error = %err,
                    "infrastructure failure; aborting batch"
                );
                txn.rollback().await?;
                return Err(ServiceError::Database(err));
            }
            Err(err) => {
                tracing::debug!(device_id, op_id = %op.op_id, error = %err, "operation rejected");
                SyncResult::Rejected
            }
        };

        // The decision commits together with whatever the engine wrote: an
        // applied mutation trio, a lone conflict event, or nothing.
        SyncOperation::create(
            &txn,
            &CreateSyncOperation {
                user_id,
                device_id: device_id.to_string(),
                op_id: op.op_id.clone(),
                entity_type: op.entity_type.clone(),
                entity_client_id: op.entity_client_id.clone(),
                operation: op.operation.clone(),
                payload: op.payload.clone(),
                base_version: op.base_version,
                result: result.clone(),
            },
        )
        .await?;
        txn.commit().await?;

        Ok(result)
    }

    async fn dispatch(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
        device_id: &str,
        op: &SyncOperationInput,
        payload: SyncPayload,
    ) -> Result<(), ServiceError> {
        match payload {
            SyncPayload::CreateTask(payload) => self
                .tasks
                .create_task_in(
                    txn,
                    &CreateTaskInput {
                        user_id,
                        title: payload.title,
                        description: payload.description,
                        status: payload.status,
                        workspace_id: payload.workspace_id,
                        client_id: payload.client_id,
                        client_rev: payload.client_rev,
                        device_id: Some(device_id.to_string()),
                    },
                )
                .await
                .map(drop),
            SyncPayload::MutateTask(payload) => self
                .tasks
                .update_task_in(
                    txn,
                    &UpdateTaskInput {
                        user_id,
                        task_id: payload.task_id,
                        title: payload.title,
                        description: payload.description,
                        status: payload.status,
                        base_version: op.base_version,
                        device_id: Some(device_id.to_string()),
                    },
                )
                .await
                .map(drop),
            SyncPayload::DeleteTask(payload) => {
                self.tasks
                    .delete_task_in(
                        txn,
                        &DeleteTaskInput {
                            user_id,
                            task_id: payload.task_id,
                            device_id: Some(device_id.to_string()),
                        },
                    )
                    .await
            }
            SyncPayload::Reserved => {
                tracing::debug!(
                    op_id = %op.op_id,
                    operation = %op.operation,
                    "reserved operation has no handler; recording as applied"
                );
                Ok(())
            }
        }
    }
}

fn parse_payload(op: &SyncOperationInput) -> Result<SyncPayload, ServiceError> {
    if op.op_id.trim().is_empty() {
        return Err(ServiceError::Validation("opId must not be empty".to_string()));
    }
    if !op.payload.is_object() {
        return Err(ServiceError::Validation("payload must be an object".to_string()));
    }
    if op.entity_type != SyncEntityType::Task {
        return Err(ServiceError::Validation("unsupported entity type".to_string()));
    }

    let payload = op.payload.clone();
    Ok(match op.operation {
        SyncOperationKind::Create => SyncPayload::CreateTask(from_payload(payload)?),
        SyncOperationKind::Update | SyncOperationKind::Status => {
            SyncPayload::MutateTask(from_payload(payload)?)
        }
        SyncOperationKind::Delete => SyncPayload::DeleteTask(from_payload(payload)?),
        SyncOperationKind::Restore | SyncOperationKind::Revert => SyncPayload::Reserved,
    })
}

fn from_payload<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|err| ServiceError::Validation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use db::{
        entities::{sync_operation, task, task_event, task_version},
        models::{
            task::Task,
            task_event::{TaskEvent, TaskEventResult},
        },
    };
    use sea_orm::EntityTrait;
    use serde_json::json;

    use super::*;
    use crate::services::permissions::WorkspacePermissions;

    async fn setup() -> (DBService, SyncService) {
        let db = DBService::new("sqlite::memory:").await.unwrap();
        let tasks = TaskService::new(db.clone(), WorkspacePermissions);
        let sync = SyncService::new(db.clone(), tasks);
        (db, sync)
    }

    fn op(
        op_id: &str,
        operation: SyncOperationKind,
        payload: serde_json::Value,
        base_version: Option<i64>,
    ) -> SyncOperationInput {
        SyncOperationInput {
            op_id: op_id.to_string(),
            entity_type: SyncEntityType::Task,
            operation,
            entity_client_id: None,
            payload,
            base_version,
        }
    }

    async fn table_counts(db: &DBService) -> (usize, usize, usize, usize) {
        (
            task::Entity::find().all(&db.pool).await.unwrap().len(),
            task_event::Entity::find().all(&db.pool).await.unwrap().len(),
            task_version::Entity::find().all(&db.pool).await.unwrap().len(),
            sync_operation::Entity::find().all(&db.pool).await.unwrap().len(),
        )
    }

    #[tokio::test]
    async fn create_operation_is_applied_and_ledgered() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-1",
                    SyncOperationKind::Create,
                    json!({ "title": "Buy milk" }),
                    None,
                )],
            )
            .await?;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].op_id, "op-1");
        assert_eq!(results[0].result, SyncResult::Applied);

        let decided = SyncOperation::find_by_device_and_op(&db.pool, "device-1", "op-1")
            .await?
            .unwrap();
        assert_eq!(decided.result, SyncResult::Applied);
        assert_eq!(decided.payload, json!({ "title": "Buy milk" }));
        Ok(())
    }

    #[tokio::test]
    async fn replayed_operation_is_a_pure_read() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let create = op(
            "op-create",
            SyncOperationKind::Create,
            json!({ "title": "Buy milk" }),
            None,
        );
        sync.apply_batch(user, "device-1", &[create]).await?;
        let task_id = task::Entity::find().all(&db.pool).await?[0].uuid;

        let update = op(
            "op-update",
            SyncOperationKind::Update,
            json!({ "taskId": task_id, "title": "Buy oat milk" }),
            None,
        );
        let first = sync.apply_batch(user, "device-1", &[update]).await?;
        assert_eq!(first[0].result, SyncResult::Applied);

        let before = table_counts(&db).await;

        // Same op id, mutated payload: the stored decision wins and nothing
        // new is written.
        let replay = op(
            "op-update",
            SyncOperationKind::Update,
            json!({ "taskId": task_id, "title": "Buy soy milk" }),
            None,
        );
        let second = sync.apply_batch(user, "device-1", &[replay]).await?;
        assert_eq!(second[0].result, SyncResult::Applied);

        assert_eq!(table_counts(&db).await, before);
        let current = Task::find_by_id(&db.pool, task_id).await?.unwrap();
        assert_eq!(current.title, "Buy oat milk");
        assert_eq!(current.version, 2);
        Ok(())
    }

    #[tokio::test]
    async fn same_op_id_on_another_device_executes_independently() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let make = |title: &str| {
            op(
                "op-1",
                SyncOperationKind::Create,
                json!({ "title": title }),
                None,
            )
        };
        sync.apply_batch(user, "device-1", &[make("From one")]).await?;
        sync.apply_batch(user, "device-2", &[make("From two")]).await?;

        assert_eq!(task::Entity::find().all(&db.pool).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_operation_does_not_stall_the_batch() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[
                    op(
                        "op-1",
                        SyncOperationKind::Create,
                        json!({ "title": "First" }),
                        None,
                    ),
                    // update without a task id: shape-invalid, rejected.
                    op(
                        "op-2",
                        SyncOperationKind::Update,
                        json!({ "title": "No target" }),
                        None,
                    ),
                    op(
                        "op-3",
                        SyncOperationKind::Create,
                        json!({ "title": "Third" }),
                        None,
                    ),
                ],
            )
            .await?;

        let outcomes: Vec<SyncResult> = results.iter().map(|r| r.result.clone()).collect();
        assert_eq!(
            outcomes,
            vec![SyncResult::Applied, SyncResult::Rejected, SyncResult::Applied]
        );
        let op_ids: Vec<&str> = results.iter().map(|r| r.op_id.as_str()).collect();
        assert_eq!(op_ids, vec!["op-1", "op-2", "op-3"]);

        assert_eq!(task::Entity::find().all(&db.pool).await?.len(), 2);
        // All three decisions are ledgered, including the rejected one.
        assert_eq!(sync_operation::Entity::find().all(&db.pool).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn stale_base_version_is_ledgered_as_conflict() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        sync.apply_batch(
            user,
            "device-1",
            &[op(
                "op-create",
                SyncOperationKind::Create,
                json!({ "title": "Buy milk" }),
                None,
            )],
        )
        .await?;
        let task_id = task::Entity::find().all(&db.pool).await?[0].uuid;

        // device-2 wins the race and advances the task to version 2.
        sync.apply_batch(
            user,
            "device-2",
            &[op(
                "op-win",
                SyncOperationKind::Update,
                json!({ "taskId": task_id, "title": "Buy oat milk" }),
                Some(1),
            )],
        )
        .await?;

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-lose",
                    SyncOperationKind::Update,
                    json!({ "taskId": task_id, "title": "Buy soy milk" }),
                    Some(1),
                )],
            )
            .await?;
        assert_eq!(results[0].result, SyncResult::Conflict);

        let current = Task::find_by_id(&db.pool, task_id).await?.unwrap();
        assert_eq!(current.title, "Buy oat milk");
        assert_eq!(current.version, 2);

        // The decision and the conflict audit event committed together.
        let decided = SyncOperation::find_by_device_and_op(&db.pool, "device-1", "op-lose")
            .await?
            .unwrap();
        assert_eq!(decided.result, SyncResult::Conflict);
        let events = TaskEvent::find_for_task(&db.pool, task_id).await?;
        let conflict = events.last().unwrap();
        assert_eq!(conflict.result, TaskEventResult::Conflict);
        assert_eq!(conflict.details, Some(json!({ "server_version": 2 })));

        // Replaying the losing operation stays a conflict without touching
        // the task again.
        let replay = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-lose",
                    SyncOperationKind::Update,
                    json!({ "taskId": task_id, "title": "Buy soy milk" }),
                    Some(1),
                )],
            )
            .await?;
        assert_eq!(replay[0].result, SyncResult::Conflict);
        assert_eq!(events.len(), TaskEvent::find_for_task(&db.pool, task_id).await?.len());
        Ok(())
    }

    #[tokio::test]
    async fn status_operation_transitions_the_task() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        sync.apply_batch(
            user,
            "device-1",
            &[op(
                "op-create",
                SyncOperationKind::Create,
                json!({ "title": "Buy milk" }),
                None,
            )],
        )
        .await?;
        let task_id = task::Entity::find().all(&db.pool).await?[0].uuid;

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-status",
                    SyncOperationKind::Status,
                    json!({ "taskId": task_id, "status": "done" }),
                    Some(1),
                )],
            )
            .await?;
        assert_eq!(results[0].result, SyncResult::Applied);

        let current = Task::find_by_id(&db.pool, task_id).await?.unwrap();
        assert_eq!(current.status, TaskStatus::Done);

        let events = TaskEvent::find_for_task(&db.pool, task_id).await?;
        assert_eq!(
            events.last().unwrap().event_type,
            db::types::TaskEventType::StatusChanged
        );
        Ok(())
    }

    #[tokio::test]
    async fn delete_operation_moves_the_task_to_trash() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        sync.apply_batch(
            user,
            "device-1",
            &[op(
                "op-create",
                SyncOperationKind::Create,
                json!({ "title": "Buy milk" }),
                None,
            )],
        )
        .await?;
        let task_id = task::Entity::find().all(&db.pool).await?[0].uuid;

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-delete",
                    SyncOperationKind::Delete,
                    json!({ "taskId": task_id }),
                    None,
                )],
            )
            .await?;
        assert_eq!(results[0].result, SyncResult::Applied);

        let current = Task::find_by_id(&db.pool, task_id).await?.unwrap();
        assert!(current.is_deleted);
        Ok(())
    }

    #[tokio::test]
    async fn reserved_operations_are_ledgered_without_a_mutation() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let results = sync
            .apply_batch(
                user,
                "device-1",
                &[op(
                    "op-restore",
                    SyncOperationKind::Restore,
                    json!({ "taskId": Uuid::new_v4() }),
                    None,
                )],
            )
            .await?;
        assert_eq!(results[0].result, SyncResult::Applied);

        let (tasks, events, versions, ledgered) = table_counts(&db).await;
        assert_eq!((tasks, events, versions), (0, 0, 0));
        assert_eq!(ledgered, 1);
        Ok(())
    }

    #[tokio::test]
    async fn workspace_member_operations_are_rejected() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let user = Uuid::new_v4();

        let mut operation = op(
            "op-member",
            SyncOperationKind::Create,
            json!({ "userId": Uuid::new_v4() }),
            None,
        );
        operation.entity_type = SyncEntityType::WorkspaceMember;

        let results = sync.apply_batch(user, "device-1", &[operation]).await?;
        assert_eq!(results[0].result, SyncResult::Rejected);

        let decided = SyncOperation::find_by_device_and_op(&db.pool, "device-1", "op-member")
            .await?
            .unwrap();
        assert_eq!(decided.entity_type, SyncEntityType::WorkspaceMember);
        assert_eq!(decided.result, SyncResult::Rejected);
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_mutation_is_rejected_and_ledgered() -> anyhow::Result<()> {
        let (db, sync) = setup().await;
        let owner = Uuid::new_v4();

        sync.apply_batch(
            owner,
            "device-1",
            &[op(
                "op-create",
                SyncOperationKind::Create,
                json!({ "title": "Owner task" }),
                None,
            )],
        )
        .await?;
        let task_id = task::Entity::find().all(&db.pool).await?[0].uuid;

        let stranger = Uuid::new_v4();
        let results = sync
            .apply_batch(
                stranger,
                "device-2",
                &[op(
                    "op-steal",
                    SyncOperationKind::Delete,
                    json!({ "taskId": task_id }),
                    None,
                )],
            )
            .await?;
        assert_eq!(results[0].result, SyncResult::Rejected);

        let current = Task::find_by_id(&db.pool, task_id).await?.unwrap();
        assert!(!current.is_deleted);
        Ok(())
    }

    #[tokio::test]
    async fn batch_request_wire_format_round_trips() -> anyhow::Result<()> {
        let (_db, sync) = setup().await;
        let request: SyncBatchRequest = serde_json::from_value(json!({
            "deviceId": "device-1",
            "operations": [{
                "opId": "op-1",
                "entityType": "task",
                "operation": "create",
                "payload": { "title": "Buy milk" },
                "baseVersion": null
            }]
        }))?;

        assert_eq!(request.device_id, "device-1");
        assert_eq!(request.operations[0].operation, SyncOperationKind::Create);

        let results = sync.apply_request(Uuid::new_v4(), &request).await?;
        assert_eq!(
            serde_json::to_value(&results)?,
            json!([{ "opId": "op-1", "result": "applied" }])
        );
        Ok(())
    }

    #[tokio::test]
    async fn blank_device_id_fails_validation_before_any_decision() {
        let (db, sync) = setup().await;
        let request = SyncBatchRequest {
            device_id: "  ".to_string(),
            operations: vec![op(
                "op-1",
                SyncOperationKind::Create,
                json!({ "title": "Buy milk" }),
                None,
            )],
        };

        let err = sync.apply_request(Uuid::new_v4(), &request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(sync_operation::Entity::find().all(&db.pool).await.unwrap().is_empty());
    }
}
