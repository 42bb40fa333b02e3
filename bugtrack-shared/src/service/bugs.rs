use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::AccessService;
use crate::auth::authorization::{require_mutate_bug, Action};
use crate::error::{Entity, FieldError, ServiceError, ServiceResult};
use crate::models::bug::{Attachment, Bug, BugFilter, Comment, CreateAttachment, CreateBug, UpdateBug};
use crate::models::trimmed;
use crate::models::user::User;

const MAX_COMMENT_LEN: usize = 2000;

impl AccessService {
    /// Bugs matching the filter; readable by any authenticated actor
    pub async fn list_bugs(&self, filter: &BugFilter) -> ServiceResult<Vec<Bug>> {
        let bugs = self.store.list_bugs(filter).await?;
        debug!(count = bugs.len(), ?filter, "Listed bugs");
        Ok(bugs)
    }

    pub async fn get_bug(&self, id: Uuid) -> ServiceResult<Bug> {
        self.store
            .find_bug(id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bug))
    }

    /// Files a bug against an existing project
    ///
    /// The project and any assignee must resolve before anything is written.
    pub async fn create_bug(&self, actor: &User, input: CreateBug) -> ServiceResult<Bug> {
        let project_id = input
            .project
            .ok_or_else(|| ServiceError::from(FieldError::required("project")))?;

        if self.store.find_project(project_id).await?.is_none() {
            return Err(ServiceError::NotFound(Entity::Project));
        }
        if let Some(assignee) = input.assigned_to {
            self.require_user(assignee).await?;
        }

        let bug = input.into_bug(actor.id)?;
        bug.validate()?;

        let bug = self.store.insert_bug(&bug).await?;
        info!(bug_id = %bug.id, project_id = %project_id, user_id = %actor.id, "Bug created");
        Ok(bug)
    }

    /// Merges the provided fields into a bug; creator or privileged role
    ///
    /// A new assignee is resolved after authorization. Field validation
    /// runs on the merged record.
    pub async fn update_bug(&self, actor: &User, id: Uuid, input: UpdateBug) -> ServiceResult<Bug> {
        let mut bug = self.get_bug(id).await?;
        require_mutate_bug(actor, &bug, Action::Update)?;

        if let Some(assignee) = input.new_assignee() {
            self.require_user(assignee).await?;
        }

        bug.apply(input.parse()?);
        bug.validate()?;

        let bug = self
            .store
            .update_bug(&bug)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bug))?;
        info!(bug_id = %bug.id, user_id = %actor.id, status = %bug.status, "Bug updated");
        Ok(bug)
    }

    /// Deletes a bug; creator or privileged role
    pub async fn delete_bug(&self, actor: &User, id: Uuid) -> ServiceResult<()> {
        let bug = self.get_bug(id).await?;
        require_mutate_bug(actor, &bug, Action::Delete)?;

        if !self.store.delete_bug(id).await? {
            return Err(ServiceError::NotFound(Entity::Bug));
        }
        info!(bug_id = %id, user_id = %actor.id, "Bug deleted");
        Ok(())
    }

    /// Appends a comment by the actor and returns the full comment list
    pub async fn add_comment(
        &self,
        actor: &User,
        id: Uuid,
        text: String,
    ) -> ServiceResult<Vec<Comment>> {
        let mut bug = self.get_bug(id).await?;

        let text = trimmed(Some(text)).ok_or_else(|| FieldError::required("text"))?;
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(ServiceError::invalid(
                "text",
                "Comment must be 1-2000 characters",
            ));
        }

        bug.push_comment(actor.id, text);
        let bug = self
            .store
            .update_bug(&bug)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bug))?;
        debug!(bug_id = %id, user_id = %actor.id, comments = bug.comments.len(), "Comment added");
        Ok(bug.comments)
    }

    /// Appends an attachment by the actor and returns the full attachment list
    pub async fn add_attachment(
        &self,
        actor: &User,
        id: Uuid,
        input: CreateAttachment,
    ) -> ServiceResult<Vec<Attachment>> {
        let mut bug = self.get_bug(id).await?;

        let attachment = input.into_attachment(actor.id)?;
        attachment.validate()?;

        bug.push_attachment(attachment);
        let bug = self
            .store
            .update_bug(&bug)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Bug))?;
        debug!(bug_id = %id, user_id = %actor.id, "Attachment added");
        Ok(bug.attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bug::{BugPriority, BugStatus};
    use crate::models::project::{CreateProject, Project};
    use crate::models::user::UserRole;
    use crate::service::test_support::Fixture;
    use crate::store::BugStore;

    async fn project(fx: &Fixture, owner: &User) -> Project {
        fx.service
            .create_project(
                owner,
                CreateProject {
                    name: Some("Alpha".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    fn filed_against(project_id: Uuid) -> CreateBug {
        CreateBug {
            title: Some("Crash on save".to_string()),
            description: Some("Saving an empty form panics".to_string()),
            project: Some(project_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let fx = Fixture::new();
        let dev = fx.user("dev", UserRole::Developer).await;
        let alpha = project(&fx, &dev).await;

        let bug = fx.service.create_bug(&dev, filed_against(alpha.id)).await.unwrap();

        assert_eq!(bug.status, BugStatus::Open);
        assert_eq!(bug.priority, BugPriority::Medium);
        assert_eq!(bug.created_by, dev.id);
        assert_eq!(bug.project_id, alpha.id);
    }

    #[tokio::test]
    async fn test_create_with_missing_project_writes_nothing() {
        let fx = Fixture::new();
        let dev = fx.user("dev", UserRole::Developer).await;

        let err = fx.service.create_bug(&dev, filed_against(Uuid::new_v4())).await;

        assert!(matches!(err, Err(ServiceError::NotFound(Entity::Project))));
        assert!(fx.store.list_bugs(&BugFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_missing_assignee_writes_nothing() {
        let fx = Fixture::new();
        let dev = fx.user("dev", UserRole::Developer).await;
        let alpha = project(&fx, &dev).await;

        let mut input = filed_against(alpha.id);
        input.assigned_to = Some(Uuid::new_v4());
        let err = fx.service.create_bug(&dev, input).await;

        assert!(matches!(err, Err(ServiceError::NotFound(Entity::User))));
        assert!(fx.store.list_bugs(&BugFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_project_is_validation_error() {
        let fx = Fixture::new();
        let dev = fx.user("dev", UserRole::Developer).await;

        let mut input = filed_against(Uuid::new_v4());
        input.project = None;
        let err = fx.service.create_bug(&dev, input).await.unwrap_err();

        match err {
            ServiceError::Validation(details) => assert_eq!(details[0].field, "project"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_permissions() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let pm = fx.user("pm", UserRole::ProjectManager).await;
        let other = fx.user("other", UserRole::Tester).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let to = |status: &str| UpdateBug {
            status: Some(status.to_string()),
            ..Default::default()
        };

        assert!(matches!(
            fx.service.update_bug(&other, bug.id, to("Closed")).await,
            Err(ServiceError::Authorization(_))
        ));

        let closed = fx.service.update_bug(&pm, bug.id, to("Closed")).await.unwrap();
        assert_eq!(closed.status, BugStatus::Closed);

        let reopened = fx.service.update_bug(&creator, bug.id, to("Open")).await.unwrap();
        assert_eq!(reopened.status, BugStatus::Open);
        assert_eq!(reopened.created_by, creator.id);
    }

    #[tokio::test]
    async fn test_update_checks_authorization_before_assignee() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let other = fx.user("other", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let assign_ghost = || UpdateBug {
            assigned_to: Some(Some(Uuid::new_v4())),
            ..Default::default()
        };

        assert!(matches!(
            fx.service.update_bug(&other, bug.id, assign_ghost()).await,
            Err(ServiceError::Authorization(_))
        ));
        assert!(matches!(
            fx.service.update_bug(&creator, bug.id, assign_ghost()).await,
            Err(ServiceError::NotFound(Entity::User))
        ));
        assert!(matches!(
            fx.service.update_bug(&creator, Uuid::new_v4(), assign_ghost()).await,
            Err(ServiceError::NotFound(Entity::Bug))
        ));
    }

    #[tokio::test]
    async fn test_update_assign_and_unassign() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let tester = fx.user("tester", UserRole::Tester).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let assigned = fx
            .service
            .update_bug(
                &creator,
                bug.id,
                UpdateBug {
                    assigned_to: Some(Some(tester.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(assigned.assigned_to, Some(tester.id));

        let unassigned = fx
            .service
            .update_bug(
                &creator,
                bug.id,
                UpdateBug {
                    assigned_to: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(unassigned.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_update_blank_title_rejected_and_not_persisted() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let err = fx
            .service
            .update_bug(
                &creator,
                bug.id,
                UpdateBug {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(err, Err(ServiceError::Validation(_))));
        assert_eq!(fx.service.get_bug(bug.id).await.unwrap().title, "Crash on save");
    }

    #[tokio::test]
    async fn test_update_blank_description_rejected_like_create() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let err = fx
            .service
            .update_bug(
                &creator,
                bug.id,
                UpdateBug {
                    description: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            err,
            Err(ServiceError::Validation(ref details)) if details[0].field == "description"
        ));

        let updated = fx
            .service
            .update_bug(
                &creator,
                bug.id,
                UpdateBug {
                    description: Some("  Steps to reproduce  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Steps to reproduce");
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let other = fx.user("other", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        assert!(matches!(
            fx.service.delete_bug(&other, bug.id).await,
            Err(ServiceError::Authorization(_))
        ));
        fx.service.delete_bug(&creator, bug.id).await.unwrap();
        assert!(matches!(
            fx.service.get_bug(bug.id).await,
            Err(ServiceError::NotFound(Entity::Bug))
        ));
    }

    #[tokio::test]
    async fn test_deleting_project_keeps_bugs() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        fx.service.delete_project(&creator, alpha.id).await.unwrap();

        assert_eq!(fx.service.get_bug(bug.id).await.unwrap().project_id, alpha.id);
    }

    #[tokio::test]
    async fn test_comments_from_any_actor_keep_order() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let x = fx.user("x", UserRole::Tester).await;
        let y = fx.user("y", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        fx.service.add_comment(&x, bug.id, "first".to_string()).await.unwrap();
        let comments = fx.service.add_comment(&y, bug.id, "second".to_string()).await.unwrap();

        let authored: Vec<(Uuid, &str)> = comments
            .iter()
            .map(|c| (c.created_by, c.text.as_str()))
            .collect();
        assert_eq!(authored, vec![(x.id, "first"), (y.id, "second")]);
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        assert!(matches!(
            fx.service.add_comment(&creator, bug.id, "   ".to_string()).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.service.add_comment(&creator, bug.id, "x".repeat(2001)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.service.add_comment(&creator, Uuid::new_v4(), "hi".to_string()).await,
            Err(ServiceError::NotFound(Entity::Bug))
        ));
    }

    #[tokio::test]
    async fn test_add_attachment() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let other = fx.user("other", UserRole::Tester).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let attachments = fx
            .service
            .add_attachment(
                &other,
                bug.id,
                CreateAttachment {
                    url: Some("https://files.example.com/trace.log".to_string()),
                    name: Some("trace.log".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].uploaded_by, other.id);

        let err = fx
            .service
            .add_attachment(
                &other,
                bug.id,
                CreateAttachment {
                    url: Some("not a url".to_string()),
                    name: Some("x".to_string()),
                },
            )
            .await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_bug_is_stable() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let bug = fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let first = fx.service.get_bug(bug.id).await.unwrap();
        let second = fx.service.get_bug(bug.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_bugs_filter() {
        let fx = Fixture::new();
        let creator = fx.user("creator", UserRole::Developer).await;
        let alpha = project(&fx, &creator).await;
        let mut urgent = filed_against(alpha.id);
        urgent.priority = Some("Critical".to_string());
        fx.service.create_bug(&creator, urgent).await.unwrap();
        fx.service.create_bug(&creator, filed_against(alpha.id)).await.unwrap();

        let critical = fx
            .service
            .list_bugs(&BugFilter {
                priority: Some(BugPriority::Critical),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(fx.service.list_bugs(&BugFilter::default()).await.unwrap().len(), 2);
    }
}
