use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::AccessService;
use crate::auth::authorization::require_update_user;
use crate::error::{Entity, ServiceError, ServiceResult};
use crate::models::user::{UpdateUser, User};

impl AccessService {
    /// All users ordered by name, for assignment pickers
    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let users = self.store.list_users().await?;
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    pub async fn get_user(&self, id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))
    }

    /// Changes the actor's own name or avatar
    pub async fn update_user(
        &self,
        actor: &User,
        id: Uuid,
        input: UpdateUser,
    ) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;
        require_update_user(actor.id, &user)?;

        user.apply(input);
        user.validate()?;

        let user = self
            .store
            .update_user(&user)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))?;
        info!(user_id = %user.id, "User profile updated");
        Ok(user)
    }
}
