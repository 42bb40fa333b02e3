/// PostgreSQL store backed by the model queries

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BugStore, ProjectStore, Store, StoreResult, UserStore};
use crate::db::pool::health_check;
use crate::models::bug::{Bug, BugFilter};
use crate::models::project::Project;
use crate::models::user::{CreateUser, User};

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn upsert_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::upsert_by_external_id(&self.pool, data).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool).await?)
    }

    async fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        Ok(User::update_profile(&self.pool, user).await?)
    }

    async fn user_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::exists(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn insert_project(&self, project: &Project) -> StoreResult<Project> {
        Ok(Project::insert(&self.pool, project).await?)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects_for(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        Ok(Project::list_visible_to(&self.pool, user_id).await?)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, project).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Project::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl BugStore for PgStore {
    async fn insert_bug(&self, bug: &Bug) -> StoreResult<Bug> {
        Ok(Bug::insert(&self.pool, bug).await?)
    }

    async fn find_bug(&self, id: Uuid) -> StoreResult<Option<Bug>> {
        Ok(Bug::find_by_id(&self.pool, id).await?)
    }

    async fn list_bugs(&self, filter: &BugFilter) -> StoreResult<Vec<Bug>> {
        Ok(Bug::list(&self.pool, filter).await?)
    }

    async fn update_bug(&self, bug: &Bug) -> StoreResult<Option<Bug>> {
        Ok(Bug::update(&self.pool, bug).await?)
    }

    async fn delete_bug(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Bug::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
