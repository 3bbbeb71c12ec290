use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::task_version, models::ids};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskVersion {
    pub id: Uuid,
    pub task_id: Uuid,
    pub version: i64,
    pub snapshot: serde_json::Value,
    pub created_by: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskVersion {
    pub task_id: Uuid,
    pub version: i64,
    pub snapshot: serde_json::Value,
    pub created_by: Uuid,
}

impl TaskVersion {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task_version::Model,
    ) -> Result<Self, DbErr> {
        let task_id = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id,
            version: model.version,
            snapshot: model.snapshot,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTaskVersion,
    ) -> Result<Self, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, data.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let active = task_version::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            version: Set(data.version),
            snapshot: Set(data.snapshot.clone()),
            created_by: Set(data.created_by),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Snapshots for one task, ascending by version.
    pub async fn find_for_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = task_version::Entity::find()
            .filter(task_version::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_version::Column::Version)
            .all(db)
            .await?;

        let mut versions = Vec::with_capacity(models.len());
        for model in models {
            versions.push(Self::from_model(db, model).await?);
        }
        Ok(versions)
    }
}
