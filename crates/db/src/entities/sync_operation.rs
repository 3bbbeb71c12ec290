use sea_orm::entity::prelude::*;

use crate::types::{SyncEntityType, SyncOperationKind, SyncResult};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub op_id: String,
    pub entity_type: SyncEntityType,
    pub entity_client_id: Option<String>,
    pub operation: SyncOperationKind,
    pub payload: Json,
    pub base_version: Option<i64>,
    pub result: SyncResult,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
