use db::DbErr;
use thiserror::Error;

/// Failure taxonomy shared by every service operation. `Conflict` is an
/// expected outcome clients recover from by re-fetching; `Database` is the
/// only variant that aborts a whole sync batch.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
    #[error("Version conflict, server version is {server_version}")]
    Conflict { server_version: i64 },
    #[error(transparent)]
    Database(#[from] DbErr),
}
