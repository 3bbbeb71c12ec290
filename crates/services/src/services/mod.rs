pub mod error;
pub mod history;
pub mod permissions;
pub mod sync;
pub mod tasks;

pub use error::ServiceError;
pub use sync::SyncService;
pub use tasks::TaskService;
