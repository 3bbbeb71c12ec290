use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::{SyncEntityType, SyncOperationKind, SyncResult};
use crate::entities::sync_operation;

/// One decided operation. Rows are written once and never revisited; the
/// stored `result` is the permanent answer for its `(device_id, op_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SyncOperation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub op_id: String,
    pub entity_type: SyncEntityType,
    pub entity_client_id: Option<String>,
    pub operation: SyncOperationKind,
    pub payload: serde_json::Value,
    pub base_version: Option<i64>,
    pub result: SyncResult,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSyncOperation {
    pub user_id: Uuid,
    pub device_id: String,
    pub op_id: String,
    pub entity_type: SyncEntityType,
    pub entity_client_id: Option<String>,
    pub operation: SyncOperationKind,
    pub payload: serde_json::Value,
    pub base_version: Option<i64>,
    pub result: SyncResult,
}

impl SyncOperation {
    fn from_model(model: sync_operation::Model) -> Self {
        Self {
            id: model.uuid,
            user_id: model.user_id,
            device_id: model.device_id,
            op_id: model.op_id,
            entity_type: model.entity_type,
            entity_client_id: model.entity_client_id,
            operation: model.operation,
            payload: model.payload,
            base_version: model.base_version,
            result: model.result,
            created_at: model.created_at,
        }
    }

    pub async fn find_by_device_and_op<C: ConnectionTrait>(
        db: &C,
        device_id: &str,
        op_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = sync_operation::Entity::find()
            .filter(sync_operation::Column::DeviceId.eq(device_id))
            .filter(sync_operation::Column::OpId.eq(op_id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Records the terminal outcome for a pair. Callers must have checked
    /// `find_by_device_and_op` in the same transaction; the unique index on
    /// `(device_id, op_id)` rejects a second insert.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateSyncOperation,
    ) -> Result<Self, DbErr> {
        let active = sync_operation::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            user_id: Set(data.user_id),
            device_id: Set(data.device_id.clone()),
            op_id: Set(data.op_id.clone()),
            entity_type: Set(data.entity_type.clone()),
            entity_client_id: Set(data.entity_client_id.clone()),
            operation: Set(data.operation.clone()),
            payload: Set(data.payload.clone()),
            base_version: Set(data.base_version),
            result: Set(data.result.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }
}
