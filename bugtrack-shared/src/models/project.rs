/// Project model, membership rules, and database operations
///
/// A project is a collaboration unit owned by its creator. The creator holds
/// every right over the project without being listed in `members`; members
/// gain read access only.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('Active', 'On Hold', 'Completed', 'Archived');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status project_status NOT NULL DEFAULT 'Active',
///     created_by UUID NOT NULL REFERENCES users(id),
///     members UUID[] NOT NULL DEFAULT '{}',
///     end_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{double_option, parse_variant, trimmed, UnknownVariant};
use crate::error::FieldError;

/// Lifecycle status of a project
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status")]
pub enum ProjectStatus {
    #[default]
    Active,

    #[serde(rename = "On Hold")]
    #[sqlx(rename = "On Hold")]
    OnHold,

    Completed,

    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "Active",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(ProjectStatus::Active),
            "On Hold" => Ok(ProjectStatus::OnHold),
            "Completed" => Ok(ProjectStatus::Completed),
            "Archived" => Ok(ProjectStatus::Archived),
            other => Err(UnknownVariant {
                value: other.to_string(),
                allowed: "Active, On Hold, Completed, Archived",
            }),
        }
    }
}

/// Membership rule violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    /// Adding a member twice is rejected rather than ignored
    #[error("User {0} is already a member")]
    AlreadyMember(Uuid),
}

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, Validate)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub status: ProjectStatus,

    /// Creator; immutable after creation
    pub created_by: Uuid,

    /// Users with read access, in the order they were added
    pub members: Vec<Uuid>,

    pub end_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a project
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Request body for updating a project
///
/// Only the mutable fields are accepted; `created_by` and `members` cannot
/// be changed through an update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,

    /// `null` clears the end date
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

/// Parsed, typed project changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}

impl CreateProject {
    /// Checks required fields and parses the status vocabulary
    pub fn into_project(self, creator: Uuid) -> Result<Project, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = trimmed(self.name);
        if name.is_none() {
            errors.push(FieldError::required("name"));
        }

        let status = match self.status.as_deref() {
            Some(s) => match parse_variant::<ProjectStatus>("status", s) {
                Ok(status) => status,
                Err(e) => {
                    errors.push(e);
                    ProjectStatus::default()
                }
            },
            None => ProjectStatus::default(),
        };

        match name {
            Some(name) if errors.is_empty() => Ok(Project::new(
                creator,
                name,
                self.description.unwrap_or_default(),
                status,
                self.end_date,
            )),
            _ => Err(errors),
        }
    }
}

impl UpdateProject {
    /// Parses the status vocabulary and normalizes free text
    pub fn parse(self) -> Result<ProjectChanges, FieldError> {
        let status = self
            .status
            .as_deref()
            .map(|s| parse_variant::<ProjectStatus>("status", s))
            .transpose()?;

        let name = match self.name {
            Some(name) => Some(trimmed(Some(name)).ok_or_else(|| FieldError::required("name"))?),
            None => None,
        };

        Ok(ProjectChanges {
            name,
            description: self.description,
            status,
            end_date: self.end_date,
        })
    }
}

impl Project {
    /// Creates a project owned by `creator` with an empty member set
    pub fn new(
        creator: Uuid,
        name: String,
        description: String,
        status: ProjectStatus,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status,
            created_by: creator,
            members: Vec::new(),
            end_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// Appends a member
    ///
    /// # Errors
    ///
    /// Returns `MembershipError::AlreadyMember` if the user is already listed;
    /// the member set is left unchanged.
    pub fn add_member(&mut self, user_id: Uuid) -> Result<(), MembershipError> {
        if self.is_member(user_id) {
            return Err(MembershipError::AlreadyMember(user_id));
        }
        self.members.push(user_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merges provided fields; the creator and members are untouched
    pub fn apply(&mut self, changes: ProjectChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(end_date) = changes.end_date {
            self.end_date = end_date;
        }
        self.updated_at = Utc::now();
    }

    /// Inserts a project record
    pub async fn insert(pool: &PgPool, project: &Project) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, description, status, created_by, members,
                                  end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, description, status, created_by, members, end_date,
                      created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.created_by)
        .bind(&project.members)
        .bind(project.end_date)
        .bind(project.created_at)
        .bind(project.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, status, created_by, members, end_date,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists projects the user created or is a member of, newest first
    pub async fn list_visible_to(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, status, created_by, members, end_date,
                   created_at, updated_at
            FROM projects
            WHERE created_by = $1 OR $1 = ANY(members)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Replaces the mutable columns of a project
    ///
    /// `created_by` and `created_at` are never written.
    ///
    /// # Returns
    ///
    /// The stored project, or None if it no longer exists
    pub async fn update(pool: &PgPool, project: &Project) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, status = $4, members = $5,
                end_date = $6, updated_at = $7
            WHERE id = $1
            RETURNING id, name, description, status, created_by, members, end_date,
                      created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(&project.members)
        .bind(project.end_date)
        .bind(project.updated_at)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes a project by ID; bugs referencing it are left in place
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha(creator: Uuid) -> Project {
        Project::new(
            creator,
            "Alpha".to_string(),
            String::new(),
            ProjectStatus::Active,
            None,
        )
    }

    #[test]
    fn test_new_project_has_no_members() {
        let creator = Uuid::new_v4();
        let project = alpha(creator);

        assert!(project.is_creator(creator));
        assert!(project.members.is_empty());
        assert!(!project.is_member(creator));
    }

    #[test]
    fn test_add_member_twice_is_rejected() {
        let mut project = alpha(Uuid::new_v4());
        let user = Uuid::new_v4();

        project.add_member(user).unwrap();
        assert_eq!(project.members, vec![user]);

        let err = project.add_member(user).unwrap_err();
        assert_eq!(err, MembershipError::AlreadyMember(user));
        assert_eq!(project.members, vec![user]);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::OnHold).unwrap(),
            "\"On Hold\""
        );
        assert_eq!("On Hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert!("on hold".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_create_requires_name() {
        let errors = CreateProject::default()
            .into_project(Uuid::new_v4())
            .unwrap_err();
        assert_eq!(errors, vec![FieldError::required("name")]);
    }

    #[test]
    fn test_create_rejects_unknown_status() {
        let input = CreateProject {
            name: Some("Alpha".to_string()),
            status: Some("Paused".to_string()),
            ..Default::default()
        };
        let errors = input.into_project(Uuid::new_v4()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "status");
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let result: Result<UpdateProject, _> =
            serde_json::from_str(r#"{"name": "Beta", "created_by": "00000000-0000-0000-0000-000000000000"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_keeps_creator_and_members() {
        let creator = Uuid::new_v4();
        let member = Uuid::new_v4();
        let mut project = alpha(creator);
        project.add_member(member).unwrap();

        let changes = UpdateProject {
            name: Some("  Beta ".to_string()),
            status: Some("Completed".to_string()),
            ..Default::default()
        }
        .parse()
        .unwrap();
        project.apply(changes);

        assert_eq!(project.name, "Beta");
        assert_eq!(project.status, ProjectStatus::Completed);
        assert_eq!(project.created_by, creator);
        assert_eq!(project.members, vec![member]);
    }

    #[test]
    fn test_update_can_clear_end_date() {
        let mut project = alpha(Uuid::new_v4());
        project.end_date = Some(Utc::now());

        let update: UpdateProject = serde_json::from_str(r#"{"end_date": null}"#).unwrap();
        project.apply(update.parse().unwrap());

        assert!(project.end_date.is_none());
    }
}
