/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/users` - All users, ordered by name
/// - `GET /v1/users/:id` - One user
/// - `PUT /v1/users/:id` - Change name or avatar (the user themselves)

use crate::{app::AppState, error::ApiResult, routes::Envelope};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use bugtrack_shared::{
    auth::middleware::AuthContext,
    models::user::{UpdateUser, User},
};
use uuid::Uuid;

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let users = state.service.list_users().await?;
    Ok(Json(Envelope::list(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let Path(id) = id?;
    let user = state.service.get_user(id).await?;
    Ok(Json(Envelope::new(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> ApiResult<Json<Envelope<User>>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let user = state.service.update_user(&auth.user, id, input).await?;
    Ok(Json(Envelope::new(user)))
}
