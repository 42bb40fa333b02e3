/// In-memory store for tests and local development
///
/// Each collection sits behind its own tokio `RwLock`. Check-then-write
/// sequences (such as the user upsert) run under a single write guard so
/// they are atomic with respect to other callers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BugStore, ProjectStore, Store, StoreError, StoreResult, UserStore};
use crate::models::bug::{Bug, BugFilter};
use crate::models::project::Project;
use crate::models::user::{CreateUser, User};

/// Store holding every record in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    projects: Arc<RwLock<HashMap<Uuid, Project>>>,
    bugs: Arc<RwLock<HashMap<Uuid, Bug>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed user, bypassing identity resolution
    ///
    /// Used to seed fixtures with a chosen role or active flag.
    pub async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.external_id == user.external_id || u.email == user.email)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn upsert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if let Some(existing) = users.values().find(|u| u.external_id == data.external_id) {
            return Ok(existing.clone());
        }

        let user = User::from_create(data);
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(stored) => {
                // Profile fields only
                stored.name = user.name.clone();
                stored.avatar = user.avatar.clone();
                stored.updated_at = user.updated_at;
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn user_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.read().await.contains_key(&id))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: &Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(StoreError::Conflict(format!("project {} exists", project.id)));
        }
        projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list_projects_for(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.is_creator(user_id) || p.is_member(user_id))
            .cloned()
            .collect();
        newest_first(&mut projects, |p| p.created_at);
        Ok(projects)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().await;
        match projects.get_mut(&project.id) {
            Some(stored) => {
                // Creator is write-once
                let created_by = stored.created_by;
                let created_at = stored.created_at;
                *stored = project.clone();
                stored.created_by = created_by;
                stored.created_at = created_at;
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.projects.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl BugStore for MemoryStore {
    async fn insert_bug(&self, bug: &Bug) -> StoreResult<Bug> {
        let mut bugs = self.bugs.write().await;
        if bugs.contains_key(&bug.id) {
            return Err(StoreError::Conflict(format!("bug {} exists", bug.id)));
        }
        bugs.insert(bug.id, bug.clone());
        Ok(bug.clone())
    }

    async fn find_bug(&self, id: Uuid) -> StoreResult<Option<Bug>> {
        Ok(self.bugs.read().await.get(&id).cloned())
    }

    async fn list_bugs(&self, filter: &BugFilter) -> StoreResult<Vec<Bug>> {
        let mut bugs: Vec<Bug> = self
            .bugs
            .read()
            .await
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        newest_first(&mut bugs, |b| b.created_at);
        Ok(bugs)
    }

    async fn update_bug(&self, bug: &Bug) -> StoreResult<Option<Bug>> {
        let mut bugs = self.bugs.write().await;
        match bugs.get_mut(&bug.id) {
            Some(stored) => {
                let created_by = stored.created_by;
                let project_id = stored.project_id;
                let created_at = stored.created_at;
                *stored = bug.clone();
                stored.created_by = created_by;
                stored.project_id = project_id;
                stored.created_at = created_at;
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_bug(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.bugs.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
