use sea_orm::entity::prelude::*;

use crate::types::{TaskEventResult, TaskEventType, TaskStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "task_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub task_id: i64,
    pub event_type: TaskEventType,
    pub performed_by: Uuid,
    pub from_status: Option<TaskStatus>,
    pub to_status: Option<TaskStatus>,
    pub details: Option<Json>,
    pub base_version: Option<i64>,
    pub result: TaskEventResult,
    pub device_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
