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
                    .table(SyncOperations::Table)
                    .col(pk_id_col(manager, SyncOperations::Id))
                    .col(uuid_col(SyncOperations::Uuid))
                    .col(uuid_col(SyncOperations::UserId))
                    .col(
                        ColumnDef::new(SyncOperations::DeviceId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::OpId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncOperations::EntityType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncOperations::EntityClientId).string())
                    .col(
                        ColumnDef::new(SyncOperations::Operation)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncOperations::Payload).json().not_null())
                    .col(ColumnDef::new(SyncOperations::BaseVersion).big_integer())
                    .col(
                        ColumnDef::new(SyncOperations::Result)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(timestamp_col(SyncOperations::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_operations_uuid")
                    .table(SyncOperations::Table)
                    .col(SyncOperations::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_operations_device_id_op_id")
                    .table(SyncOperations::Table)
                    .col(SyncOperations::DeviceId)
                    .col(SyncOperations::OpId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_operations_user_id")
                    .table(SyncOperations::Table)
                    .col(SyncOperations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sync_operations_created_at")
                    .table(SyncOperations::Table)
                    .col(SyncOperations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncOperations::Table).to_owned())
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

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum SyncOperations {
    Table,
    Id,
    Uuid,
    UserId,
    DeviceId,
    OpId,
    EntityType,
    EntityClientId,
    Operation,
    Payload,
    BaseVersion,
    Result,
    CreatedAt,
}
