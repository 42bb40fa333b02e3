/// Resource access service
///
/// One method per logical action exposed to the routing layer. Each
/// operation resolves the resources it references, consults the
/// authorization policy, applies the change through the model, and
/// persists it. Nothing is written when any step fails.
///
/// # Operations
///
/// - Projects: list, get, create, update, delete, add member
/// - Bugs: list, get, create, update, delete, add comment, add attachment
/// - Users: list, get
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bugtrack_shared::models::project::CreateProject;
/// use bugtrack_shared::models::user::User;
/// use bugtrack_shared::service::AccessService;
/// use bugtrack_shared::store::MemoryStore;
///
/// # async fn example(actor: User) -> Result<(), Box<dyn std::error::Error>> {
/// let service = AccessService::new(Arc::new(MemoryStore::new()));
/// let project = service
///     .create_project(&actor, CreateProject {
///         name: Some("Alpha".to_string()),
///         ..Default::default()
///     })
///     .await?;
/// assert_eq!(project.created_by, actor.id);
/// # Ok(())
/// # }
/// ```

mod bugs;
mod projects;
mod users;

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Entity, ServiceError, ServiceResult};
use crate::store::Store;

/// Entry point for every authorized read and write
#[derive(Clone)]
pub struct AccessService {
    store: Arc<dyn Store>,
}

impl AccessService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The backing store, for health checks
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn require_user(&self, id: Uuid) -> ServiceResult<()> {
        if self.store.user_exists(id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(Entity::User))
        }
    }
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService").finish_non_exhaustive()
    }
}
