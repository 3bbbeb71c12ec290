use sea_orm::{ConnectOptions, Database, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, TransactionTrait};

pub mod entities;
pub mod models;
pub mod types;

#[derive(Clone)]
pub struct DBService {
    pub pool: DatabaseConnection,
}

impl DBService {
    /// Connects, applies pending migrations and returns the shared pool.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options.sqlx_logging(false);

        let pool = Database::connect(options).await?;
        if pool.get_database_backend() == DatabaseBackend::Sqlite {
            pool.execute_unprepared("PRAGMA journal_mode = WAL").await?;
            pool.execute_unprepared("PRAGMA synchronous = NORMAL").await?;
            pool.execute_unprepared("PRAGMA busy_timeout = 30000").await?;
        }
        tracing::debug!(database_url, "applying pending migrations");
        db_migration::Migrator::up(&pool, None).await?;

        Ok(DBService { pool })
    }

    pub fn database_url_from_env() -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tasks.sqlite?mode=rwc".to_string())
    }
}
