use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::{TaskEventResult, TaskEventType};
use crate::{entities::task_event, models::ids, types::TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskEvent {
    pub id: Uuid,
    pub task_id: Uuid,
    pub event_type: TaskEventType,
    pub performed_by: Uuid,
    pub from_status: Option<TaskStatus>,
    pub to_status: Option<TaskStatus>,
    pub details: Option<serde_json::Value>,
    pub base_version: Option<i64>,
    pub result: TaskEventResult,
    pub device_id: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskEvent {
    pub task_id: Uuid,
    pub event_type: TaskEventType,
    pub performed_by: Uuid,
    pub from_status: Option<TaskStatus>,
    pub to_status: Option<TaskStatus>,
    pub details: Option<serde_json::Value>,
    pub base_version: Option<i64>,
    pub result: TaskEventResult,
    pub device_id: Option<String>,
}

impl TaskEvent {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task_event::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id,
            event_type: model.event_type,
            performed_by: model.performed_by,
            from_status: model.from_status,
            to_status: model.to_status,
            details: model.details,
            base_version: model.base_version,
            result: model.result,
            device_id: model.device_id,
            created_at: model.created_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTaskEvent,
    ) -> Result<Self, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, data.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let active = task_event::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            event_type: Set(data.event_type.clone()),
            performed_by: Set(data.performed_by),
            from_status: Set(data.from_status.clone()),
            to_status: Set(data.to_status.clone()),
            details: Set(data.details.clone()),
            base_version: Set(data.base_version),
            result: Set(data.result.clone()),
            device_id: Set(data.device_id.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Full audit trail for one task, oldest first.
    pub async fn find_for_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = task_event::Entity::find()
            .filter(task_event::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_event::Column::Id)
            .all(db)
            .await?;

        let mut events = Vec::with_capacity(models.len());
        for model in models {
            events.push(Self::from_model(db, model).await?);
        }
        Ok(events)
    }
}
