use db::{
    ConnectionTrait, DbErr,
    models::{
        task::Task,
        task_event::{CreateTaskEvent, TaskEvent, TaskEventResult, TaskEventType},
        task_version::{CreateTaskVersion, TaskVersion},
    },
    types::TaskStatus,
};
use serde_json::json;
use uuid::Uuid;

/// Audit context for one mutation attempt.
#[derive(Debug, Clone)]
pub struct MutationRecord<'a> {
    pub event_type: TaskEventType,
    pub performed_by: Uuid,
    pub from_status: Option<TaskStatus>,
    pub to_status: Option<TaskStatus>,
    pub base_version: Option<i64>,
    pub device_id: Option<&'a str>,
}

/// Appends the audit pair for a successful mutation: one `applied` event and
/// one full-state snapshot at the task's current version. Runs on the
/// caller's connection; if the enclosing transaction rolls back, both
/// appends roll back with it.
pub async fn record_applied<C: ConnectionTrait>(
    db: &C,
    task: &Task,
    record: MutationRecord<'_>,
) -> Result<(), DbErr> {
    TaskEvent::create(
        db,
        &CreateTaskEvent {
            task_id: task.id,
            event_type: record.event_type,
            performed_by: record.performed_by,
            from_status: record.from_status,
            to_status: record.to_status,
            details: None,
            base_version: record.base_version,
            result: TaskEventResult::Applied,
            device_id: record.device_id.map(str::to_string),
        },
    )
    .await?;

    TaskVersion::create(
        db,
        &CreateTaskVersion {
            task_id: task.id,
            version: task.version,
            snapshot: serde_json::to_value(task).map_err(|err| DbErr::Custom(err.to_string()))?,
            created_by: record.performed_by,
        },
    )
    .await?;

    Ok(())
}

/// Appends a `conflict` event carrying the server's actual version. No
/// snapshot is written since the task itself did not change; the event keeps
/// the attempted write visible in the audit trail.
pub async fn record_conflict<C: ConnectionTrait>(
    db: &C,
    task: &Task,
    performed_by: Uuid,
    base_version: i64,
    device_id: Option<&str>,
) -> Result<(), DbErr> {
    TaskEvent::create(
        db,
        &CreateTaskEvent {
            task_id: task.id,
            event_type: TaskEventType::Updated,
            performed_by,
            from_status: None,
            to_status: None,
            details: Some(json!({ "server_version": task.version })),
            base_version: Some(base_version),
            result: TaskEventResult::Conflict,
            device_id: device_id.map(str::to_string),
        },
    )
    .await?;

    Ok(())
}
