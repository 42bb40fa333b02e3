/// Authorization policy for projects, bugs, and user profiles
///
/// Every check here is a pure function of the actor and the loaded resource.
/// Callers resolve the resource first, so a missing resource is reported as
/// not found before any permission is consulted.
///
/// # Permission Model
///
/// | Resource | Read | Mutate |
/// |---|---|---|
/// | Project | creator or member | creator |
/// | Bug | any authenticated actor | creator or privileged role |
/// | User | any authenticated actor | the user themselves |
///
/// Membership grants read access only. The privileged role
/// ([`UserRole::PRIVILEGED`](crate::models::user::UserRole::PRIVILEGED)) has
/// no extra rights over projects.
///
/// # Example
///
/// ```
/// use bugtrack_shared::auth::authorization::{can_mutate_project, can_read_project};
/// use bugtrack_shared::models::project::Project;
/// use uuid::Uuid;
///
/// let creator = Uuid::new_v4();
/// let member = Uuid::new_v4();
/// let mut project = Project::new(creator, "Alpha".into(), String::new(), Default::default(), None);
/// project.add_member(member).unwrap();
///
/// assert!(can_read_project(member, &project));
/// assert!(!can_mutate_project(member, &project));
/// ```

use std::fmt;

use uuid::Uuid;

use crate::error::Entity;
use crate::models::bug::Bug;
use crate::models::project::Project;
use crate::models::user::User;

/// Action being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    AddMember,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::AddMember => "add members to",
        })
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor lacks creator, membership, or privileged standing
    #[error("Not authorized to {action} this {resource}")]
    NotAuthorized { action: Action, resource: Entity },
}

impl AuthzError {
    fn denied(action: Action, resource: Entity) -> Self {
        AuthzError::NotAuthorized { action, resource }
    }
}

/// Creator or member
pub fn can_read_project(actor: Uuid, project: &Project) -> bool {
    project.is_creator(actor) || project.is_member(actor)
}

/// Creator only; covers update, delete, and adding members
pub fn can_mutate_project(actor: Uuid, project: &Project) -> bool {
    project.is_creator(actor)
}

/// Any authenticated actor may read any bug
pub fn can_read_bug(_actor: &User, _bug: &Bug) -> bool {
    true
}

/// Creator or holder of the privileged role
pub fn can_mutate_bug(actor: &User, bug: &Bug) -> bool {
    bug.is_creator(actor.id) || actor.is_privileged()
}

/// Users may only edit their own profile
pub fn can_update_user(actor: Uuid, user: &User) -> bool {
    actor == user.id
}

pub fn require_update_user(actor: Uuid, user: &User) -> Result<(), AuthzError> {
    if can_update_user(actor, user) {
        Ok(())
    } else {
        Err(AuthzError::denied(Action::Update, Entity::User))
    }
}

pub fn require_read_project(actor: Uuid, project: &Project) -> Result<(), AuthzError> {
    if can_read_project(actor, project) {
        Ok(())
    } else {
        Err(AuthzError::denied(Action::Read, Entity::Project))
    }
}

pub fn require_mutate_project(
    actor: Uuid,
    project: &Project,
    action: Action,
) -> Result<(), AuthzError> {
    if can_mutate_project(actor, project) {
        Ok(())
    } else {
        Err(AuthzError::denied(action, Entity::Project))
    }
}

pub fn require_mutate_bug(actor: &User, bug: &Bug, action: Action) -> Result<(), AuthzError> {
    if can_mutate_bug(actor, bug) {
        Ok(())
    } else {
        Err(AuthzError::denied(action, Entity::Bug))
    }
}
