/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every library error converts into
/// [`ApiError`], which renders the status code and JSON body.
///
/// | Service error | Status |
/// |---|---|
/// | `NotFound` | 404 |
/// | `Authorization` | 403 |
/// | `Validation` | 422 |
/// | `DuplicateMember` | 409 |
/// | `Authentication` | 401 |
/// | `Store(Conflict)` | 409 |
/// | `Store(Database)` | 500 |

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bugtrack_shared::auth::middleware::AuthError;
use bugtrack_shared::error::{FieldError, ServiceError};
use bugtrack_shared::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate member
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<FieldError>),

    /// Internal server error (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Error code (e.g., "not_found", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ServiceError::Authorization(authz) => ApiError::Forbidden(authz.to_string()),
            ServiceError::Validation(details) => ApiError::ValidationError(details),
            ServiceError::DuplicateMember { .. } => ApiError::Conflict(err.to_string()),
            ServiceError::Authentication(msg) => ApiError::Unauthorized(msg),
            ServiceError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Malformed JSON and unknown fields are reported as validation failures
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                ApiError::ValidationError(vec![FieldError::new("body", e.body_text())])
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

/// Malformed ids in the path
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::ValidationError(vec![FieldError::new("query", rejection.body_text())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugtrack_shared::auth::authorization::{Action, AuthzError};
    use bugtrack_shared::error::Entity;
    use uuid::Uuid;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::ValidationError(vec![FieldError::required("title")]);
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
    }

    #[test]
    fn test_service_error_status_mapping() {
        assert_eq!(status_of(ServiceError::NotFound(Entity::Bug)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ServiceError::Authorization(AuthzError::NotAuthorized {
                action: Action::Update,
                resource: Entity::Project,
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ServiceError::Validation(vec![FieldError::required("name")])),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ServiceError::DuplicateMember {
                project_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Authentication("bad".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::Store(StoreError::Conflict("email".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Store(StoreError::Database(sqlx::Error::PoolTimedOut))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
