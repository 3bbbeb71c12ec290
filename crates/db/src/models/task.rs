use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub use crate::types::TaskStatus;
use crate::{
    entities::task,
    models::{ids, workspace_member::WorkspaceMember},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub owner_user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub version: i64,
    pub is_deleted: bool,
    #[ts(type = "Date | null")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub client_id: Option<String>,
    pub client_rev: Option<i64>,
    pub last_modified_device_id: Option<String>,
    #[ts(type = "Date")]
    pub last_modified_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTaskRecord {
    pub workspace_id: Uuid,
    pub owner_user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub client_id: Option<String>,
    pub client_rev: Option<i64>,
    pub device_id: Option<String>,
}

/// Field-wise changes for one mutation; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub device_id: Option<String>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            workspace_id,
            owner_user_id: model.owner_user_id,
            title: model.title,
            description: model.description,
            status: model.status,
            version: model.version,
            is_deleted: model.is_deleted,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
            client_id: model.client_id,
            client_rev: model.client_rev,
            last_modified_device_id: model.last_modified_device_id,
            last_modified_at: model.last_modified_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Non-deleted task owned by the user, or nothing.
    pub async fn find_by_id_for_user<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .filter(task::Column::OwnerUserId.eq(user_id))
            .filter(task::Column::IsDeleted.eq(false))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Non-deleted tasks across every workspace the user belongs to,
    /// most recently updated first.
    pub async fn list_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let workspace_row_ids =
            WorkspaceMember::workspace_row_ids_for_user(db, user_id).await?;
        if workspace_row_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = task::Entity::find()
            .filter(task::Column::WorkspaceId.is_in(workspace_row_ids))
            .filter(task::Column::IsDeleted.eq(false))
            .order_by_desc(task::Column::UpdatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTaskRecord,
    ) -> Result<Self, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, data.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_row_id),
            owner_user_id: Set(data.owner_user_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.clone()),
            version: Set(1),
            is_deleted: Set(false),
            deleted_at: Set(None),
            deleted_by: Set(None),
            client_id: Set(data.client_id.clone()),
            client_rev: Set(data.client_rev),
            last_modified_device_id: Set(data.device_id.clone()),
            last_modified_at: Set(now),
            created_by: Set(data.owner_user_id),
            updated_by: Set(data.owner_user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Applies the supplied fields and advances `version` by exactly one.
    /// The read and the write share the caller's transaction.
    pub async fn apply_changes<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        updated_by: Uuid,
        changes: &TaskChanges,
    ) -> Result<Self, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let next_version = record.version + 1;
        let now = Utc::now();
        let mut active: task::ActiveModel = record.into();
        if let Some(title) = &changes.title {
            active.title = Set(title.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(status) = &changes.status {
            active.status = Set(status.clone());
        }
        if let Some(device_id) = &changes.device_id {
            active.last_modified_device_id = Set(Some(device_id.clone()));
        }
        active.version = Set(next_version);
        active.updated_by = Set(updated_by);
        active.last_modified_at = Set(now);
        active.updated_at = Set(now);

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Marks the task deleted without removing the row; advances `version`.
    pub async fn soft_delete<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        deleted_by: Uuid,
        device_id: Option<&str>,
    ) -> Result<Self, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let next_version = record.version + 1;
        let now = Utc::now();
        let mut active: task::ActiveModel = record.into();
        active.is_deleted = Set(true);
        active.deleted_at = Set(Some(now));
        active.deleted_by = Set(Some(deleted_by));
        if let Some(device_id) = device_id {
            active.last_modified_device_id = Set(Some(device_id.to_string()));
        }
        active.version = Set(next_version);
        active.updated_by = Set(deleted_by);
        active.last_modified_at = Set(now);
        active.updated_at = Set(now);

        let deleted = active.update(db).await?;
        Self::from_model(db, deleted).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::workspace::Workspace;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn create_record(workspace_id: Uuid, owner: Uuid, title: &str) -> CreateTaskRecord {
        CreateTaskRecord {
            workspace_id,
            owner_user_id: owner,
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            client_id: None,
            client_rev: None,
            device_id: None,
        }
    }

    #[tokio::test]
    async fn create_starts_at_version_one() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let workspace = Workspace::create(&db, "Personal", owner).await.unwrap();

        let task = Task::create(&db, &create_record(workspace.id, owner, "Buy milk"))
            .await
            .unwrap();

        assert_eq!(task.version, 1);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.is_deleted);
    }

    #[tokio::test]
    async fn changes_advance_version_by_one_and_leave_other_fields() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let workspace = Workspace::create(&db, "Personal", owner).await.unwrap();
        let task = Task::create(&db, &create_record(workspace.id, owner, "Buy milk"))
            .await
            .unwrap();

        let updated = Task::apply_changes(
            &db,
            task.id,
            owner,
            &TaskChanges {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "Buy milk");
        assert_eq!(updated.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn soft_delete_keeps_row_and_advances_version() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let workspace = Workspace::create(&db, "Personal", owner).await.unwrap();
        let task = Task::create(&db, &create_record(workspace.id, owner, "Buy milk"))
            .await
            .unwrap();

        let deleted = Task::soft_delete(&db, task.id, owner, Some("device-1"))
            .await
            .unwrap();

        assert!(deleted.is_deleted);
        assert_eq!(deleted.version, 2);
        assert_eq!(deleted.deleted_by, Some(owner));
        assert!(deleted.deleted_at.is_some());

        // Hidden from owner-scoped lookups, still present by id.
        assert!(Task::find_by_id_for_user(&db, task.id, owner)
            .await
            .unwrap()
            .is_none());
        assert!(Task::find_by_id(&db, task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_for_user_spans_memberships_and_skips_deleted() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let workspace = Workspace::create(&db, "Personal", owner).await.unwrap();
        let other = Workspace::create(&db, "Team", owner).await.unwrap();

        let kept = Task::create(&db, &create_record(workspace.id, owner, "Keep me"))
            .await
            .unwrap();
        let trashed = Task::create(&db, &create_record(other.id, owner, "Trash me"))
            .await
            .unwrap();
        Task::soft_delete(&db, trashed.id, owner, None).await.unwrap();

        let listed = Task::list_for_user(&db, owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);

        let stranger = Uuid::new_v4();
        assert!(Task::list_for_user(&db, stranger).await.unwrap().is_empty());
    }
}
