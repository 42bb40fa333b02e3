/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Projects the caller created or belongs to
/// - `POST /v1/projects` - Create a project owned by the caller
/// - `GET /v1/projects/:id` - Read (creator or member)
/// - `PUT /v1/projects/:id` - Partial update (creator only)
/// - `DELETE /v1/projects/:id` - Delete (creator only)
/// - `POST /v1/projects/:id/members` - Add a member (creator only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Empty, Envelope},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use bugtrack_shared::{
    auth::middleware::AuthContext,
    error::FieldError,
    models::project::{CreateProject, Project, UpdateProject},
};
use serde::Deserialize;
use uuid::Uuid;

/// Add member request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<Vec<Project>>>> {
    let projects = state.service.list_projects(&auth.user).await?;
    Ok(Json(Envelope::list(projects)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<Project>>> {
    let Path(id) = id?;
    let project = state.service.get_project(&auth.user, id).await?;
    Ok(Json(Envelope::new(project)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Project>>)> {
    let Json(input) = payload?;
    let project = state.service.create_project(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(project))))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProject>, JsonRejection>,
) -> ApiResult<Json<Envelope<Project>>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let project = state.service.update_project(&auth.user, id, input).await?;
    Ok(Json(Envelope::new(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<Empty>>> {
    let Path(id) = id?;
    state.service.delete_project(&auth.user, id).await?;
    Ok(Json(Envelope::new(Empty::default())))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Project>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::ValidationError(vec![FieldError::required("user_id")]))?;

    let project = state.service.add_member(&auth.user, id, user_id).await?;
    Ok(Json(Envelope::new(project)))
}
