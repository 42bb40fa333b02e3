/// Bug model, ownership and assignment rules, and database operations
///
/// A bug belongs to a project for referential validity but has its own
/// lifecycle: deleting the project leaves its bugs in place. Status is a
/// free enum write with no guarded transitions (`Closed` may go back to
/// `Open`).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE bug_status AS ENUM ('Open', 'In Progress', 'Resolved', 'Closed');
/// CREATE TYPE bug_priority AS ENUM ('Low', 'Medium', 'High', 'Critical');
///
/// CREATE TABLE bugs (
///     id UUID PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL,
///     status bug_status NOT NULL DEFAULT 'Open',
///     priority bug_priority NOT NULL DEFAULT 'Medium',
///     project_id UUID NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id),
///     assigned_to UUID REFERENCES users(id),
///     due_date TIMESTAMPTZ,
///     comments JSONB NOT NULL DEFAULT '[]',
///     attachments JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, parse_variant, trimmed, UnknownVariant};
use crate::error::FieldError;

/// Workflow status of a bug
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bug_status")]
pub enum BugStatus {
    #[default]
    Open,

    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,

    Resolved,

    Closed,
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Open => "Open",
            BugStatus::InProgress => "In Progress",
            BugStatus::Resolved => "Resolved",
            BugStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BugStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(BugStatus::Open),
            "In Progress" => Ok(BugStatus::InProgress),
            "Resolved" => Ok(BugStatus::Resolved),
            "Closed" => Ok(BugStatus::Closed),
            other => Err(UnknownVariant {
                value: other.to_string(),
                allowed: "Open, In Progress, Resolved, Closed",
            }),
        }
    }
}

/// Priority of a bug
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bug_priority")]
pub enum BugPriority {
    Low,

    #[default]
    Medium,

    High,

    Critical,
}

impl BugPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugPriority::Low => "Low",
            BugPriority::Medium => "Medium",
            BugPriority::High => "High",
            BugPriority::Critical => "Critical",
        }
    }
}

impl fmt::Display for BugPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BugPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(BugPriority::Low),
            "Medium" => Ok(BugPriority::Medium),
            "High" => Ok(BugPriority::High),
            "Critical" => Ok(BugPriority::Critical),
            other => Err(UnknownVariant {
                value: other.to_string(),
                allowed: "Low, Medium, High, Critical",
            }),
        }
    }
}

/// A comment on a bug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Comment {
    pub id: Uuid,

    #[validate(length(min = 1, max = 2000, message = "Comment must be 1-2000 characters"))]
    pub text: String,

    /// Author of the comment
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
}

/// A file attached to a bug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Attachment {
    pub id: Uuid,

    #[validate(url(message = "Attachment url must be a valid URL"))]
    pub url: String,

    #[validate(length(min = 1, max = 255, message = "Attachment name must be 1-255 characters"))]
    pub name: String,

    pub uploaded_by: Uuid,

    pub uploaded_at: DateTime<Utc>,
}

/// Bug model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, Validate)]
pub struct Bug {
    pub id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: String,

    pub status: BugStatus,

    pub priority: BugPriority,

    /// Project the bug was filed against
    #[serde(rename = "project")]
    pub project_id: Uuid,

    /// Creator; immutable after creation
    pub created_by: Uuid,

    pub assigned_to: Option<Uuid>,

    pub due_date: Option<DateTime<Utc>>,

    /// Append-only, in insertion order
    #[sqlx(json)]
    pub comments: Vec<Comment>,

    #[sqlx(json)]
    pub attachments: Vec<Attachment>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Request body for filing a bug
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBug {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(alias = "project_id")]
    pub project: Option<Uuid>,

    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Request body for a partial bug update
///
/// `created_by`, `project`, comments, and attachments are not updatable and
/// are rejected as unknown fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBug {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,

    /// `null` unassigns the bug
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    /// `null` clears the due date
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Parsed, typed bug changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BugChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<BugStatus>,
    pub priority: Option<BugPriority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Request body for adding an attachment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAttachment {
    pub url: Option<String>,
    pub name: Option<String>,
}

/// Query filter for listing bugs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BugFilter {
    pub status: Option<BugStatus>,
    pub priority: Option<BugPriority>,

    #[serde(alias = "project_id")]
    pub project: Option<Uuid>,

    pub assigned_to: Option<Uuid>,
}

impl BugFilter {
    /// Whether a bug passes every set criterion
    pub fn matches(&self, bug: &Bug) -> bool {
        self.status.map_or(true, |s| bug.status == s)
            && self.priority.map_or(true, |p| bug.priority == p)
            && self.project.map_or(true, |p| bug.project_id == p)
            && self.assigned_to.map_or(true, |a| bug.assigned_to == Some(a))
    }
}

impl CreateBug {
    /// Checks required fields and parses the status and priority vocabularies
    ///
    /// The project and assignee references are copied as given; resolving
    /// them is the caller's job.
    pub fn into_bug(self, creator: Uuid) -> Result<Bug, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = trimmed(self.title);
        if title.is_none() {
            errors.push(FieldError::required("title"));
        }
        let description = trimmed(self.description);
        if description.is_none() {
            errors.push(FieldError::required("description"));
        }
        if self.project.is_none() {
            errors.push(FieldError::required("project"));
        }

        let status = parse_or_default::<BugStatus>("status", self.status, &mut errors);
        let priority = parse_or_default::<BugPriority>("priority", self.priority, &mut errors);

        match (title, description, self.project) {
            (Some(title), Some(description), Some(project_id)) if errors.is_empty() => {
                let mut bug = Bug::new(creator, project_id, title, description);
                bug.status = status;
                bug.priority = priority;
                bug.assigned_to = self.assigned_to;
                bug.due_date = self.due_date;
                Ok(bug)
            }
            _ => Err(errors),
        }
    }
}

fn parse_or_default<T>(field: &str, value: Option<String>, errors: &mut Vec<FieldError>) -> T
where
    T: FromStr<Err = UnknownVariant> + Default,
{
    match value.as_deref().map(|v| parse_variant::<T>(field, v)) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            errors.push(e);
            T::default()
        }
        None => T::default(),
    }
}

impl UpdateBug {
    /// Parses the status and priority vocabularies
    pub fn parse(self) -> Result<BugChanges, Vec<FieldError>> {
        let mut errors = Vec::new();

        let status = match self.status.as_deref().map(|s| parse_variant::<BugStatus>("status", s)) {
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };
        let priority = match self
            .priority
            .as_deref()
            .map(|p| parse_variant::<BugPriority>("priority", p))
        {
            Some(Ok(priority)) => Some(priority),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(BugChanges {
            // Blank text is kept blank so the merged record fails validation
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            status,
            priority,
            assigned_to: self.assigned_to,
            due_date: self.due_date,
        })
    }

    /// The new assignee, if the update sets one
    pub fn new_assignee(&self) -> Option<Uuid> {
        self.assigned_to.flatten()
    }
}

impl CreateAttachment {
    pub fn into_attachment(self, uploader: Uuid) -> Result<Attachment, Vec<FieldError>> {
        let mut errors = Vec::new();
        let url = trimmed(self.url);
        if url.is_none() {
            errors.push(FieldError::required("url"));
        }
        let name = trimmed(self.name);
        if name.is_none() {
            errors.push(FieldError::required("name"));
        }

        match (url, name) {
            (Some(url), Some(name)) => Ok(Attachment {
                id: Uuid::new_v4(),
                url,
                name,
                uploaded_by: uploader,
                uploaded_at: Utc::now(),
            }),
            _ => Err(errors),
        }
    }
}

impl Bug {
    /// Creates an `Open`, `Medium` priority bug with no assignee
    pub fn new(creator: Uuid, project_id: Uuid, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            status: BugStatus::default(),
            priority: BugPriority::default(),
            project_id,
            created_by: creator,
            assigned_to: None,
            due_date: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Merges provided fields; creator, project, and history are untouched
    pub fn apply(&mut self, changes: BugChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = changes.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        self.updated_at = Utc::now();
    }

    /// Appends a comment and returns it
    pub fn push_comment(&mut self, author: Uuid, text: String) -> &Comment {
        let now = Utc::now();
        self.comments.push(Comment {
            id: Uuid::new_v4(),
            text,
            created_by: author,
            created_at: now,
        });
        self.updated_at = now;
        // Just pushed, so the list is non-empty
        &self.comments[self.comments.len() - 1]
    }

    pub fn push_attachment(&mut self, attachment: Attachment) {
        self.updated_at = attachment.uploaded_at;
        self.attachments.push(attachment);
    }

    /// Inserts a bug record
    pub async fn insert(pool: &PgPool, bug: &Bug) -> Result<Self, sqlx::Error> {
        let bug = sqlx::query_as::<_, Bug>(
            r#"
            INSERT INTO bugs (id, title, description, status, priority, project_id,
                              created_by, assigned_to, due_date, comments, attachments,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, title, description, status, priority, project_id, created_by,
                      assigned_to, due_date, comments, attachments, created_at, updated_at
            "#,
        )
        .bind(bug.id)
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.status)
        .bind(bug.priority)
        .bind(bug.project_id)
        .bind(bug.created_by)
        .bind(bug.assigned_to)
        .bind(bug.due_date)
        .bind(Json(&bug.comments))
        .bind(Json(&bug.attachments))
        .bind(bug.created_at)
        .bind(bug.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(bug)
    }

    /// Finds a bug by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let bug = sqlx::query_as::<_, Bug>(
            r#"
            SELECT id, title, description, status, priority, project_id, created_by,
                   assigned_to, due_date, comments, attachments, created_at, updated_at
            FROM bugs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(bug)
    }

    /// Lists bugs matching a filter, newest first
    pub async fn list(pool: &PgPool, filter: &BugFilter) -> Result<Vec<Self>, sqlx::Error> {
        let bugs = sqlx::query_as::<_, Bug>(
            r#"
            SELECT id, title, description, status, priority, project_id, created_by,
                   assigned_to, due_date, comments, attachments, created_at, updated_at
            FROM bugs
            WHERE ($1::bug_status IS NULL OR status = $1)
              AND ($2::bug_priority IS NULL OR priority = $2)
              AND ($3::uuid IS NULL OR project_id = $3)
              AND ($4::uuid IS NULL OR assigned_to = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.project)
        .bind(filter.assigned_to)
        .fetch_all(pool)
        .await?;

        Ok(bugs)
    }

    /// Replaces the mutable columns of a bug
    ///
    /// # Returns
    ///
    /// The stored bug, or None if it no longer exists
    pub async fn update(pool: &PgPool, bug: &Bug) -> Result<Option<Self>, sqlx::Error> {
        let bug = sqlx::query_as::<_, Bug>(
            r#"
            UPDATE bugs
            SET title = $2, description = $3, status = $4, priority = $5,
                assigned_to = $6, due_date = $7, comments = $8, attachments = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING id, title, description, status, priority, project_id, created_by,
                      assigned_to, due_date, comments, attachments, created_at, updated_at
            "#,
        )
        .bind(bug.id)
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.status)
        .bind(bug.priority)
        .bind(bug.assigned_to)
        .bind(bug.due_date)
        .bind(Json(&bug.comments))
        .bind(Json(&bug.attachments))
        .bind(bug.updated_at)
        .fetch_optional(pool)
        .await?;

        Ok(bug)
    }

    /// Deletes a bug by ID
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bugs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
