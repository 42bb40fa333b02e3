use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::AccessService;
use crate::auth::authorization::{require_mutate_project, require_read_project, Action};
use crate::error::{Entity, ServiceError, ServiceResult};
use crate::models::project::{CreateProject, MembershipError, Project, UpdateProject};
use crate::models::user::User;

impl AccessService {
    /// Projects the actor created or belongs to
    pub async fn list_projects(&self, actor: &User) -> ServiceResult<Vec<Project>> {
        let projects = self.store.list_projects_for(actor.id).await?;
        debug!(user_id = %actor.id, count = projects.len(), "Listed projects");
        Ok(projects)
    }

    /// Loads a project the actor may read
    ///
    /// # Errors
    ///
    /// - `NotFound(Project)` if no project has this id
    /// - `Authorization` if the actor is neither creator nor member
    pub async fn get_project(&self, actor: &User, id: Uuid) -> ServiceResult<Project> {
        let project = self.load_project(id).await?;
        require_read_project(actor.id, &project)?;
        Ok(project)
    }

    /// Creates a project owned by the actor with no members
    pub async fn create_project(&self, actor: &User, input: CreateProject) -> ServiceResult<Project> {
        let project = input.into_project(actor.id)?;
        project.validate()?;

        let project = self.store.insert_project(&project).await?;
        info!(project_id = %project.id, user_id = %actor.id, "Project created");
        Ok(project)
    }

    /// Merges the provided fields into a project; creator only
    pub async fn update_project(
        &self,
        actor: &User,
        id: Uuid,
        input: UpdateProject,
    ) -> ServiceResult<Project> {
        let mut project = self.load_project(id).await?;
        require_mutate_project(actor.id, &project, Action::Update)?;

        project.apply(input.parse()?);
        project.validate()?;

        let project = self
            .store
            .update_project(&project)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Project))?;
        info!(project_id = %project.id, user_id = %actor.id, "Project updated");
        Ok(project)
    }

    /// Deletes a project; creator only. Bugs filed against it are kept.
    pub async fn delete_project(&self, actor: &User, id: Uuid) -> ServiceResult<()> {
        let project = self.load_project(id).await?;
        require_mutate_project(actor.id, &project, Action::Delete)?;

        if !self.store.delete_project(id).await? {
            return Err(ServiceError::NotFound(Entity::Project));
        }
        info!(project_id = %id, user_id = %actor.id, "Project deleted");
        Ok(())
    }

    /// Adds a user to a project's member set
    ///
    /// Checks run in order: project exists, user exists, actor is the
    /// creator, user is not already a member.
    ///
    /// # Errors
    ///
    /// `DuplicateMember` if the user is already listed; adding twice is
    /// rejected, not ignored.
    pub async fn add_member(
        &self,
        actor: &User,
        project_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Project> {
        let mut project = self.load_project(project_id).await?;
        self.require_user(user_id).await?;
        require_mutate_project(actor.id, &project, Action::AddMember)?;

        project.add_member(user_id).map_err(|e| match e {
            MembershipError::AlreadyMember(user_id) => {
                ServiceError::DuplicateMember { project_id, user_id }
            }
        })?;

        let project = self
            .store
            .update_project(&project)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Project))?;
        info!(project_id = %project_id, member_id = %user_id, "Member added");
        Ok(project)
    }

    async fn load_project(&self, id: Uuid) -> ServiceResult<Project> {
        self.store
            .find_project(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Project))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::models::project::ProjectStatus;
    use crate::models::user::UserRole;
    use crate::service::test_support::Fixture;
    use crate::store::ProjectStore;

    fn named(name: &str) -> CreateProject {
        CreateProject {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn rename(name: &str) -> UpdateProject {
        UpdateProject {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sets_creator_and_empty_members() {
        let fx = Fixture::new();
        let ada = fx.user("ada", UserRole::Developer).await;

        let project = fx.service.create_project(&ada, named("Alpha")).await.unwrap();

        assert_eq!(project.created_by, ada.id);
        assert!(project.members.is_empty());
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[tokio::test]
    async fn test_create_rejects_overlong_name() {
        let fx = Fixture::new();
        let ada = fx.user("ada", UserRole::Developer).await;

        let result = fx.service.create_project(&ada, named(&"x".repeat(101))).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(fx.store.list_projects_for(ada.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alpha_scenario() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let b = fx.user("b", UserRole::Developer).await;

        let alpha = fx.service.create_project(&a, named("Alpha")).await.unwrap();

        let err = fx.service.update_project(&b, alpha.id, rename("Beta")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let updated = fx.service.add_member(&a, alpha.id, b.id).await.unwrap();
        assert_eq!(updated.members, vec![b.id]);

        let seen = fx.service.get_project(&b, alpha.id).await.unwrap();
        assert_eq!(seen.name, "Alpha");

        let err = fx.service.update_project(&b, alpha.id, rename("Beta")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_stranger_cannot_read() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let stranger = fx.user("s", UserRole::ProjectManager).await;
        let alpha = fx.service.create_project(&a, named("Alpha")).await.unwrap();

        let err = fx.service.get_project(&stranger, alpha.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Authorization(AuthzError::NotAuthorized {
                action: Action::Read,
                ..
            })
        ));
        assert!(fx.service.list_projects(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_member_twice_is_duplicate() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let b = fx.user("b", UserRole::Developer).await;
        let alpha = fx.service.create_project(&a, named("Alpha")).await.unwrap();

        fx.service.add_member(&a, alpha.id, b.id).await.unwrap();
        let err = fx.service.add_member(&a, alpha.id, b.id).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::DuplicateMember { user_id, .. } if user_id == b.id
        ));
        let stored = fx.store.find_project(alpha.id).await.unwrap().unwrap();
        assert_eq!(stored.members, vec![b.id]);
    }

    #[tokio::test]
    async fn test_add_member_check_order() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let b = fx.user("b", UserRole::Developer).await;
        let alpha = fx.service.create_project(&a, named("Alpha")).await.unwrap();

        // Missing project wins over everything
        let err = fx.service.add_member(&b, uuid::Uuid::new_v4(), uuid::Uuid::new_v4()).await;
        assert!(matches!(err, Err(ServiceError::NotFound(Entity::Project))));

        // Missing user is reported before the creator check
        let err = fx.service.add_member(&b, alpha.id, uuid::Uuid::new_v4()).await;
        assert!(matches!(err, Err(ServiceError::NotFound(Entity::User))));

        let err = fx.service.add_member(&b, alpha.id, b.id).await;
        assert!(matches!(err, Err(ServiceError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_update_clears_end_date_and_keeps_creator() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let mut input = named("Alpha");
        input.end_date = Some(chrono::Utc::now());
        let alpha = fx.service.create_project(&a, input).await.unwrap();

        let patch: UpdateProject =
            serde_json::from_str(r#"{"end_date": null, "status": "On Hold"}"#).unwrap();
        let updated = fx.service.update_project(&a, alpha.id, patch).await.unwrap();

        assert!(updated.end_date.is_none());
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert_eq!(updated.created_by, a.id);
    }

    #[tokio::test]
    async fn test_delete_is_creator_only() {
        let fx = Fixture::new();
        let a = fx.user("a", UserRole::Developer).await;
        let pm = fx.user("pm", UserRole::ProjectManager).await;
        let alpha = fx.service.create_project(&a, named("Alpha")).await.unwrap();

        assert!(matches!(
            fx.service.delete_project(&pm, alpha.id).await,
            Err(ServiceError::Authorization(_))
        ));
        fx.service.delete_project(&a, alpha.id).await.unwrap();
        assert!(matches!(
            fx.service.get_project(&a, alpha.id).await,
            Err(ServiceError::NotFound(Entity::Project))
        ));
    }
}
