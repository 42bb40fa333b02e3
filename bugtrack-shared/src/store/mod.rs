/// Persistent store abstraction
///
/// The access service and identity resolver depend only on these traits, so
/// the same rules run against PostgreSQL in production and an in-memory
/// store in tests and local development.
///
/// # Backends
///
/// - [`postgres::PgStore`]: sqlx-backed, delegates to the model queries
/// - [`memory::MemoryStore`]: `HashMap`s behind a tokio `RwLock`
///
/// Every write is a whole-record replace of a single user, project, or bug.
/// Concurrent updates to the same record are last-writer-wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::bug::{Bug, BugFilter};
use crate::models::project::Project;
use crate::models::user::{CreateUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Inserts a user or returns the one already holding `external_id`
    ///
    /// Must be atomic: concurrent calls for one external id yield one record.
    async fn upsert_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Writes the profile fields of a user; `None` if it no longer exists
    async fn update_user(&self, user: &User) -> StoreResult<Option<User>>;

    async fn user_exists(&self, id: Uuid) -> StoreResult<bool>;
}

/// Project persistence
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, project: &Project) -> StoreResult<Project>;

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Projects the user created or is a member of, newest first
    async fn list_projects_for(&self, user_id: Uuid) -> StoreResult<Vec<Project>>;

    /// Replaces a project; `None` if it no longer exists
    async fn update_project(&self, project: &Project) -> StoreResult<Option<Project>>;

    /// Deletes a project; `false` if it did not exist
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;
}

/// Bug persistence
#[async_trait]
pub trait BugStore: Send + Sync {
    async fn insert_bug(&self, bug: &Bug) -> StoreResult<Bug>;

    async fn find_bug(&self, id: Uuid) -> StoreResult<Option<Bug>>;

    /// Bugs matching the filter, newest first
    async fn list_bugs(&self, filter: &BugFilter) -> StoreResult<Vec<Bug>>;

    /// Replaces a bug; `None` if it no longer exists
    async fn update_bug(&self, bug: &Bug) -> StoreResult<Option<Bug>>;

    /// Deletes a bug; `false` if it did not exist
    async fn delete_bug(&self, id: Uuid) -> StoreResult<bool>;
}

/// A complete backend
#[async_trait]
pub trait Store: UserStore + ProjectStore + BugStore {
    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
