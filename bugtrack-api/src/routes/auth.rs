/// Current-user endpoint
///
/// # Endpoints
///
/// - `GET /v1/auth/me` - The user resolved from the bearer token

use crate::{error::ApiResult, routes::Envelope};
use axum::{Extension, Json};
use bugtrack_shared::{auth::middleware::AuthContext, models::user::User};

/// Returns the authenticated user, creating it on first login
pub async fn me(Extension(auth): Extension<AuthContext>) -> ApiResult<Json<Envelope<User>>> {
    Ok(Json(Envelope::new(auth.user)))
}
