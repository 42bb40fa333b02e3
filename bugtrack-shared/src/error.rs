/// Service-level error taxonomy
///
/// Every operation exposed by [`crate::service::AccessService`] and
/// [`crate::auth::identity::IdentityResolver`] fails with a [`ServiceError`].
/// The HTTP layer maps each variant to its own status code.
///
/// # Example
///
/// ```
/// use bugtrack_shared::error::{Entity, ServiceError};
///
/// let err = ServiceError::NotFound(Entity::Project);
/// assert_eq!(err.to_string(), "Project not found");
/// ```

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::store::StoreError;

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Entity kinds that can be referenced by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    User,
    Project,
    Bug,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::User => "User",
            Entity::Project => "Project",
            Entity::Bug => "Bug",
        })
    }
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error for a required field that was absent
    pub fn required(field: &str) -> Self {
        Self::new(field, format!("{} is required", field))
    }
}

/// Errors returned by the resource access service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A referenced project, user, or bug id does not resolve
    #[error("{0} not found")]
    NotFound(Entity),

    /// The actor lacks creator or privileged standing
    #[error(transparent)]
    Authorization(#[from] AuthzError),

    /// One or more fields are missing, malformed, or out of range
    #[error("Validation failed: {}", .0.iter().map(|e| e.field.as_str()).collect::<Vec<_>>().join(", "))]
    Validation(Vec<FieldError>),

    /// The user is already a member of the project
    #[error("User {user_id} is already a member of project {project_id}")]
    DuplicateMember { project_id: Uuid, user_id: Uuid },

    /// Credential verification failed or produced no usable identity
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Persistent store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<FieldError> for ServiceError {
    fn from(err: FieldError) -> Self {
        ServiceError::Validation(vec![err])
    }
}

impl From<Vec<FieldError>> for ServiceError {
    fn from(errors: Vec<FieldError>) -> Self {
        ServiceError::Validation(errors)
    }
}

/// Flattens `validator` output into field errors, sorted by field name
impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::Validation(details)
    }
}
