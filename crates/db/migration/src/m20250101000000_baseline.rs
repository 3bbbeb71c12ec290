use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Workspaces::Table)
                    .col(pk_id_col(manager, Workspaces::Id))
                    .col(uuid_col(Workspaces::Uuid))
                    .col(ColumnDef::new(Workspaces::Name).string().not_null())
                    .col(uuid_col(Workspaces::OwnerUserId))
                    .col(uuid_col(Workspaces::CreatedBy))
                    .col(uuid_col(Workspaces::UpdatedBy))
                    .col(timestamp_col(Workspaces::CreatedAt))
                    .col(timestamp_col(Workspaces::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspaces_uuid")
                    .table(Workspaces::Table)
                    .col(Workspaces::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspaces_owner_user_id")
                    .table(Workspaces::Table)
                    .col(Workspaces::OwnerUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(WorkspaceMembers::Table)
                    .col(pk_id_col(manager, WorkspaceMembers::Id))
                    .col(uuid_col(WorkspaceMembers::Uuid))
                    .col(
                        ColumnDef::new(WorkspaceMembers::WorkspaceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(uuid_col(WorkspaceMembers::UserId))
                    .col(
                        ColumnDef::new(WorkspaceMembers::CanView)
                            .boolean()
                            .not_null()
                            .default(Expr::val(true)),
                    )
                    .col(
                        ColumnDef::new(WorkspaceMembers::CanCreate)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(WorkspaceMembers::CanEdit)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(WorkspaceMembers::CanDelete)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(uuid_nullable_col(WorkspaceMembers::InvitedBy))
                    .col(timestamp_col(WorkspaceMembers::CreatedAt))
                    .col(timestamp_col(WorkspaceMembers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspace_members_uuid")
                    .table(WorkspaceMembers::Table)
                    .col(WorkspaceMembers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspace_members_workspace_id_user_id")
                    .table(WorkspaceMembers::Table)
                    .col(WorkspaceMembers::WorkspaceId)
                    .col(WorkspaceMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workspace_members_user_id")
                    .table(WorkspaceMembers::Table)
                    .col(WorkspaceMembers::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(ColumnDef::new(Tasks::WorkspaceId).big_integer().not_null())
                    .col(uuid_col(Tasks::OwnerUserId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("pending")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Version)
                            .big_integer()
                            .not_null()
                            .default(Expr::val(1)),
                    )
                    .col(
                        ColumnDef::new(Tasks::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(Tasks::DeletedAt).timestamp())
                    .col(uuid_nullable_col(Tasks::DeletedBy))
                    .col(ColumnDef::new(Tasks::ClientId).string())
                    .col(ColumnDef::new(Tasks::ClientRev).big_integer())
                    .col(ColumnDef::new(Tasks::LastModifiedDeviceId).string())
                    .col(timestamp_col(Tasks::LastModifiedAt))
                    .col(uuid_col(Tasks::CreatedBy))
                    .col(uuid_col(Tasks::UpdatedBy))
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_workspace_id")
                    .table(Tasks::Table)
                    .col(Tasks::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_owner_user_id")
                    .table(Tasks::Table)
                    .col(Tasks::OwnerUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskVersions::Table)
                    .col(pk_id_col(manager, TaskVersions::Id))
                    .col(uuid_col(TaskVersions::Uuid))
                    .col(ColumnDef::new(TaskVersions::TaskId).big_integer().not_null())
                    .col(ColumnDef::new(TaskVersions::Version).big_integer().not_null())
                    .col(ColumnDef::new(TaskVersions::Snapshot).json().not_null())
                    .col(uuid_col(TaskVersions::CreatedBy))
                    .col(timestamp_col(TaskVersions::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_versions_uuid")
                    .table(TaskVersions::Table)
                    .col(TaskVersions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_versions_task_id_version")
                    .table(TaskVersions::Table)
                    .col(TaskVersions::TaskId)
                    .col(TaskVersions::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskEvents::Table)
                    .col(pk_id_col(manager, TaskEvents::Id))
                    .col(uuid_col(TaskEvents::Uuid))
                    .col(ColumnDef::new(TaskEvents::TaskId).big_integer().not_null())
                    .col(
                        ColumnDef::new(TaskEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(uuid_col(TaskEvents::PerformedBy))
                    .col(ColumnDef::new(TaskEvents::FromStatus).string_len(32))
                    .col(ColumnDef::new(TaskEvents::ToStatus).string_len(32))
                    .col(ColumnDef::new(TaskEvents::Details).json())
                    .col(ColumnDef::new(TaskEvents::BaseVersion).big_integer())
                    .col(
                        ColumnDef::new(TaskEvents::Result)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("applied")),
                    )
                    .col(ColumnDef::new(TaskEvents::DeviceId).string())
                    .col(timestamp_col(TaskEvents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_events_uuid")
                    .table(TaskEvents::Table)
                    .col(TaskEvents::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_events_task_id")
                    .table(TaskEvents::Table)
                    .col(TaskEvents::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkspaceMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn uuid_nullable_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
    Uuid,
    Name,
    OwnerUserId,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WorkspaceMembers {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    UserId,
    CanView,
    CanCreate,
    CanEdit,
    CanDelete,
    InvitedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    OwnerUserId,
    Title,
    Description,
    Status,
    Version,
    IsDeleted,
    DeletedAt,
    DeletedBy,
    ClientId,
    ClientRev,
    LastModifiedDeviceId,
    LastModifiedAt,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskVersions {
    Table,
    Id,
    Uuid,
    TaskId,
    Version,
    Snapshot,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum TaskEvents {
    Table,
    Id,
    Uuid,
    TaskId,
    EventType,
    PerformedBy,
    FromStatus,
    ToStatus,
    Details,
    BaseVersion,
    Result,
    DeviceId,
    CreatedAt,
}
