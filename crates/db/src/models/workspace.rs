use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{workspace, workspace_member},
    models::ids,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    fn from_model(model: workspace::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            owner_user_id: model.owner_user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Creates a workspace and the owner's membership row with every
    /// capability set, in the caller's transaction.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        name: &str,
        owner_user_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = workspace::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            owner_user_id: Set(owner_user_id),
            created_by: Set(owner_user_id),
            updated_by: Set(owner_user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let member = workspace_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(model.id),
            user_id: Set(owner_user_id),
            can_view: Set(true),
            can_create: Set(true),
            can_edit: Set(true),
            can_delete: Set(true),
            invited_by: Set(Some(owner_user_id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        member.insert(db).await?;

        Ok(Self::from_model(model))
    }

    /// First workspace the user is a member of, oldest membership first.
    pub async fn first_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let membership = workspace_member::Entity::find()
            .filter(workspace_member::Column::UserId.eq(user_id))
            .order_by_asc(workspace_member::Column::Id)
            .one(db)
            .await?;

        match membership {
            Some(member) => ids::workspace_uuid_by_id(db, member.workspace_id).await,
            None => Ok(None),
        }
    }
}
