use db::{
    ConnectionTrait, DBService, TransactionTrait,
    models::{
        task::{CreateTaskRecord, Task, TaskChanges},
        task_event::TaskEventType,
        workspace::Workspace,
    },
    types::TaskStatus,
};
use uuid::Uuid;

use crate::services::{
    error::ServiceError,
    history::{self, MutationRecord},
    permissions::{Capability, WorkspacePermissions},
};

#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub workspace_id: Option<Uuid>,
    pub client_id: Option<String>,
    pub client_rev: Option<i64>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskInput {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub base_version: Option<i64>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteTaskInput {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub device_id: Option<String>,
}

/// Owns the task lifecycle: versioned create/update/soft-delete with fresh
/// permission checks and an audit pair per attempt. Public methods open
/// their own transaction; the `*_in` variants run on a caller-supplied one.
#[derive(Clone)]
pub struct TaskService {
    db: DBService,
    permissions: WorkspacePermissions,
}

impl TaskService {
    pub fn new(db: DBService, permissions: WorkspacePermissions) -> Self {
        Self { db, permissions }
    }

    pub async fn create_task(&self, input: &CreateTaskInput) -> Result<Task, ServiceError> {
        let txn = self.db.pool.begin().await?;
        match self.create_task_in(&txn, input).await {
            Ok(task) => {
                txn.commit().await?;
                Ok(task)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    pub async fn update_task(&self, input: &UpdateTaskInput) -> Result<Task, ServiceError> {
        let txn = self.db.pool.begin().await?;
        match self.update_task_in(&txn, input).await {
            Ok(task) => {
                txn.commit().await?;
                Ok(task)
            }
            // A version conflict leaves an audit event behind; keep it.
            Err(err @ ServiceError::Conflict { .. }) => {
                txn.commit().await?;
                Err(err)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    pub async fn delete_task(&self, input: &DeleteTaskInput) -> Result<(), ServiceError> {
        let txn = self.db.pool.begin().await?;
        match self.delete_task_in(&txn, input).await {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    pub async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        Ok(Task::list_for_user(&self.db.pool, user_id).await?)
    }

    pub(crate) async fn create_task_in<C: ConnectionTrait>(
        &self,
        db: &C,
        input: &CreateTaskInput,
    ) -> Result<Task, ServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("title must not be empty".to_string()));
        }

        let workspace = self.resolve_workspace(db, input).await?;
        self.permissions
            .require(db, &workspace, input.user_id, Capability::Create)
            .await?;

        let task = Task::create(
            db,
            &CreateTaskRecord {
                workspace_id: workspace.id,
                owner_user_id: input.user_id,
                title: title.to_string(),
                description: input.description.clone(),
                status: input.status.clone().unwrap_or_default(),
                client_id: input.client_id.clone(),
                client_rev: input.client_rev,
                device_id: input.device_id.clone(),
            },
        )
        .await?;

        history::record_applied(
            db,
            &task,
            MutationRecord {
                event_type: TaskEventType::Created,
                performed_by: input.user_id,
                from_status: None,
                to_status: None,
                base_version: None,
                device_id: input.device_id.as_deref(),
            },
        )
        .await?;

        Ok(task)
    }

    /// Explicit workspace, else the user's first membership, else a fresh
    /// personal workspace — every user always has somewhere to create in.
    async fn resolve_workspace<C: ConnectionTrait>(
        &self,
        db: &C,
        input: &CreateTaskInput,
    ) -> Result<Workspace, ServiceError> {
        if let Some(workspace_id) = input.workspace_id {
            return Workspace::find_by_id(db, workspace_id)
                .await?
                .ok_or(ServiceError::NotFound("workspace"));
        }

        if let Some(workspace_id) = Workspace::first_for_user(db, input.user_id).await? {
            return Workspace::find_by_id(db, workspace_id)
                .await?
                .ok_or(ServiceError::NotFound("workspace"));
        }

        tracing::debug!(user_id = %input.user_id, "user has no workspace; creating a personal one");
        Ok(Workspace::create(db, "Personal", input.user_id).await?)
    }

    pub(crate) async fn update_task_in<C: ConnectionTrait>(
        &self,
        db: &C,
        input: &UpdateTaskInput,
    ) -> Result<Task, ServiceError> {
        let existing = Task::find_by_id_for_user(db, input.task_id, input.user_id)
            .await?
            .ok_or(ServiceError::NotFound("task"))?;
        let workspace = Workspace::find_by_id(db, existing.workspace_id)
            .await?
            .ok_or(ServiceError::NotFound("workspace"))?;
        self.permissions
            .require(db, &workspace, input.user_id, Capability::Edit)
            .await?;

        // The version check runs strictly before any field mutation; the
        // read and the eventual write share the caller's transaction.
        if let Some(base_version) = input.base_version
            && base_version != existing.version
        {
            history::record_conflict(
                db,
                &existing,
                input.user_id,
                base_version,
                input.device_id.as_deref(),
            )
            .await?;
            return Err(ServiceError::Conflict {
                server_version: existing.version,
            });
        }

        let updated = Task::apply_changes(
            db,
            existing.id,
            input.user_id,
            &TaskChanges {
                title: input.title.clone(),
                description: input.description.clone(),
                status: input.status.clone(),
                device_id: input.device_id.clone(),
            },
        )
        .await?;

        let event_type = match &input.status {
            Some(status) if *status != existing.status => TaskEventType::StatusChanged,
            _ => TaskEventType::Updated,
        };
        history::record_applied(
            db,
            &updated,
            MutationRecord {
                event_type,
                performed_by: input.user_id,
                from_status: Some(existing.status.clone()),
                to_status: Some(updated.status.clone()),
                base_version: input.base_version,
                device_id: input.device_id.as_deref(),
            },
        )
        .await?;

        Ok(updated)
    }

    pub(crate) async fn delete_task_in<C: ConnectionTrait>(
        &self,
        db: &C,
        input: &DeleteTaskInput,
    ) -> Result<(), ServiceError> {
        let existing = Task::find_by_id_for_user(db, input.task_id, input.user_id)
            .await?
            .ok_or(ServiceError::NotFound("task"))?;
        let workspace = Workspace::find_by_id(db, existing.workspace_id)
            .await?
            .ok_or(ServiceError::NotFound("workspace"))?;
        self.permissions
            .require(db, &workspace, input.user_id, Capability::Delete)
            .await?;

        let deleted = Task::soft_delete(db, existing.id, input.user_id, input.device_id.as_deref())
            .await?;
        history::record_applied(
            db,
            &deleted,
            MutationRecord {
                event_type: TaskEventType::MovedToTrash,
                performed_by: input.user_id,
                from_status: None,
                to_status: None,
                base_version: None,
                device_id: input.device_id.as_deref(),
            },
        )
        .await?;

        Ok(())
    }
}
