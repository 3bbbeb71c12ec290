use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::workspace_member, models::ids};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub invited_by: Option<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWorkspaceMember {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub invited_by: Option<Uuid>,
}

impl WorkspaceMember {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: workspace_member::Model,
    ) -> Result<Self, DbErr> {
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            workspace_id,
            user_id: model.user_id,
            can_view: model.can_view,
            can_create: model.can_create,
            can_edit: model.can_edit,
            can_delete: model.can_delete,
            invited_by: model.invited_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let workspace_row_id = match ids::workspace_id_by_uuid(db, workspace_id).await? {
            Some(id) => id,
            None => return Ok(None),
        };

        let record = workspace_member::Entity::find()
            .filter(workspace_member::Column::WorkspaceId.eq(workspace_row_id))
            .filter(workspace_member::Column::UserId.eq(user_id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWorkspaceMember,
    ) -> Result<Self, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, data.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let now = Utc::now();
        let active = workspace_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_row_id),
            user_id: Set(data.user_id),
            can_view: Set(data.can_view),
            can_create: Set(data.can_create),
            can_edit: Set(data.can_edit),
            can_delete: Set(data.can_delete),
            invited_by: Set(data.invited_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Row ids of every workspace the user belongs to.
    pub async fn workspace_row_ids_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<i64>, DbErr> {
        workspace_member::Entity::find()
            .select_only()
            .column(workspace_member::Column::WorkspaceId)
            .filter(workspace_member::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await
    }
}
