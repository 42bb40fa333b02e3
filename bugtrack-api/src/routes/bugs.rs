/// Bug endpoints
///
/// # Endpoints
///
/// - `GET /v1/bugs` - List, filtered by `status`, `priority`, `project`, `assigned_to`
/// - `POST /v1/bugs` - File a bug against an existing project
/// - `GET /v1/bugs/:id` - Read (any authenticated user)
/// - `PUT /v1/bugs/:id` - Partial update (creator or project manager)
/// - `DELETE /v1/bugs/:id` - Delete (creator or project manager)
/// - `POST /v1/bugs/:id/comments` - Append a comment
/// - `POST /v1/bugs/:id/attachments` - Append an attachment

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{Empty, Envelope},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use bugtrack_shared::{
    auth::middleware::AuthContext,
    models::bug::{Attachment, Bug, BugFilter, Comment, CreateAttachment, CreateBug, UpdateBug},
};
use serde::Deserialize;
use uuid::Uuid;

/// Comment request
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn list_bugs(
    State(state): State<AppState>,
    filter: Result<Query<BugFilter>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<Bug>>>> {
    let Query(filter) = filter?;
    let bugs = state.service.list_bugs(&filter).await?;
    Ok(Json(Envelope::list(bugs)))
}

pub async fn get_bug(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<Bug>>> {
    let Path(id) = id?;
    let bug = state.service.get_bug(id).await?;
    Ok(Json(Envelope::new(bug)))
}

pub async fn create_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateBug>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Bug>>)> {
    let Json(input) = payload?;
    let bug = state.service.create_bug(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(bug))))
}

pub async fn update_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBug>, JsonRejection>,
) -> ApiResult<Json<Envelope<Bug>>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let bug = state.service.update_bug(&auth.user, id, input).await?;
    Ok(Json(Envelope::new(bug)))
}

pub async fn delete_bug(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<Empty>>> {
    let Path(id) = id?;
    state.service.delete_bug(&auth.user, id).await?;
    Ok(Json(Envelope::new(Empty::default())))
}

/// Returns the bug's full comment list
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Vec<Comment>>>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let comments = state.service.add_comment(&auth.user, id, request.text).await?;
    Ok(Json(Envelope::list(comments)))
}

/// Returns the bug's full attachment list
pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateAttachment>, JsonRejection>,
) -> ApiResult<Json<Envelope<Vec<Attachment>>>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let attachments = state.service.add_attachment(&auth.user, id, input).await?;
    Ok(Json(Envelope::list(attachments)))
}
